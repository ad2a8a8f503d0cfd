use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "sheets_cli")]
#[command(about = "Read, write and format Google Sheets, auditing every effective change")]
#[command(version)]
pub struct Args {
    /// Log level (logs go to stderr)
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,

    /// Path to config file
    #[arg(long, default_value = "config/sheets_cli.toml", global = true)]
    pub config: String,

    /// Spreadsheet that receives audit rows (overrides config)
    #[arg(long, value_name = "SPREADSHEET_ID", global = true)]
    pub audit_spreadsheet: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionArg {
    Cols,
    Rows,
}

/// JSON arguments take inline JSON or `@path/to/file.json`.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read values from a range
    Read {
        spreadsheet_id: String,
        range: String,
        /// ROWS or COLUMNS
        #[arg(long)]
        major: Option<String>,
        /// FORMATTED_VALUE, UNFORMATTED_VALUE or FORMULA
        #[arg(long)]
        render: Option<String>,
        /// SERIAL_NUMBER or FORMATTED_STRING
        #[arg(long)]
        date: Option<String>,
        /// Print the whole value range instead of just the rows
        #[arg(long)]
        full: bool,
    },
    /// Write values to a range, skipping the write when the first cell is unchanged
    Write {
        spreadsheet_id: String,
        range: String,
        values: String,
        /// RAW or USER_ENTERED
        #[arg(long, default_value = "USER_ENTERED")]
        input: String,
        #[arg(long)]
        major: Option<String>,
    },
    /// Append rows after the table found at a range
    Append {
        spreadsheet_id: String,
        range: String,
        values: String,
        #[arg(long, default_value = "USER_ENTERED")]
        input: String,
        /// INSERT_ROWS or OVERWRITE
        #[arg(long, default_value = "INSERT_ROWS")]
        insert: String,
        #[arg(long)]
        major: Option<String>,
    },
    /// Clear the values of a range
    Clear { spreadsheet_id: String, range: String },
    /// Read several ranges at once
    #[command(alias = "batchGet")]
    BatchGet {
        spreadsheet_id: String,
        /// Ranges, comma separated or as separate arguments
        #[arg(required = true, num_args = 1..)]
        ranges: Vec<String>,
        #[arg(long)]
        major: Option<String>,
        #[arg(long)]
        render: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Write several ranges at once (values.batchUpdate body)
    #[command(alias = "batchWrite")]
    BatchWrite { spreadsheet_id: String, body: String },
    /// Mark a row unavailable: paint it red and set its Status
    Highlight { spreadsheet_id: String, range: String },
    /// Clear a row's highlight: paint it white and set its Status to N/A
    Unhighlight { spreadsheet_id: String, range: String },
    /// Apply cell formatting to a range
    Format {
        spreadsheet_id: String,
        range: String,
        format: String,
    },
    /// Fetch a range with its formatting
    #[command(alias = "getFormat")]
    GetFormat { spreadsheet_id: String, range: String },
    /// Draw borders around and inside a range
    Borders {
        spreadsheet_id: String,
        range: String,
        style: Option<String>,
    },
    /// Merge the cells of a range
    Merge {
        spreadsheet_id: String,
        range: String,
        /// MERGE_ALL, MERGE_COLUMNS or MERGE_ROWS
        #[arg(long = "type", default_value = "MERGE_ALL")]
        merge_type: String,
    },
    /// Unmerge the cells of a range
    Unmerge { spreadsheet_id: String, range: String },
    /// Set the pixel size of columns (letters) or rows (1-based numbers)
    Resize {
        spreadsheet_id: String,
        sheet_name: String,
        #[arg(value_enum)]
        dimension: DimensionArg,
        start: String,
        end: String,
        pixels: u32,
    },
    /// Fit column widths to their contents
    #[command(alias = "autoResize")]
    AutoResize {
        spreadsheet_id: String,
        sheet_name: String,
        start_col: String,
        end_col: String,
    },
    /// Freeze leading rows and/or columns
    Freeze {
        spreadsheet_id: String,
        sheet_name: String,
        rows: Option<u32>,
        cols: Option<u32>,
    },
    /// Copy formatting from one range to another
    #[command(alias = "copyFormat")]
    CopyFormat {
        spreadsheet_id: String,
        source: String,
        destination: String,
    },
    /// Create a new spreadsheet
    Create { title: String },
    /// Show spreadsheet metadata
    Info { spreadsheet_id: String },
    #[command(alias = "addSheet")]
    AddSheet { spreadsheet_id: String, title: String },
    #[command(alias = "deleteSheet")]
    DeleteSheet { spreadsheet_id: String, sheet_name: String },
    #[command(alias = "renameSheet")]
    RenameSheet {
        spreadsheet_id: String,
        old_name: String,
        new_name: String,
    },
    /// Send raw batchUpdate requests
    Batch {
        spreadsheet_id: String,
        requests: String,
        /// Range whose prior values are compared for the audit entry
        #[arg(long)]
        diff_range: Option<String>,
    },
}

impl Command {
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Command::Read { .. } | Command::BatchGet { .. } | Command::Info { .. } | Command::GetFormat { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_aliases_parse() {
        let args = Args::parse_from(["sheets_cli", "batchGet", "ss", "A1:B2,C3", "D4"]);
        match args.command {
            Command::BatchGet { ranges, .. } => assert_eq!(ranges, vec!["A1:B2,C3", "D4"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::parse_from(["sheets_cli", "info", "ss", "--log-level", "debug"]);
        assert_eq!(args.log_level, "debug");
        assert!(args.command.is_read_only());
    }

    #[test]
    fn resize_takes_dimension_keyword() {
        let args = Args::parse_from(["sheets_cli", "resize", "ss", "Sheet1", "cols", "A", "C", "120"]);
        assert!(matches!(
            args.command,
            Command::Resize { dimension: DimensionArg::Cols, pixels: 120, .. }
        ));
        assert!(!args.command.is_read_only());
    }

    #[test]
    fn missing_arguments_fail_fast() {
        assert!(Args::try_parse_from(["sheets_cli", "write", "ss", "A1"]).is_err());
    }
}
