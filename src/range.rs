use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("invalid column letters: {0:?}")]
    InvalidInput(String),
    #[error("Unsupported A1 range: {0}. Use A1 or A1:B2 format.")]
    InvalidRangeFormat(String),
}

/// Zero-based, half-open bounds of an A1 reference such as `Sheet1!B2:D4`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRange {
    pub sheet_name: Option<String>,
    pub start_row_index: u32,
    pub end_row_index: u32,
    pub start_column_index: u32,
    pub end_column_index: u32,
}

/// Grid bounds as the Sheets API expects them: keyed by numeric sheet id,
/// every bound optional (an absent bound is unbounded).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_row_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_row_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_column_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_column_index: Option<u32>,
}

/// Bijective base-26: `A` = 0, `Z` = 25, `AA` = 26. Case-insensitive.
pub fn column_letters_to_index(letters: &str) -> Result<u32, RangeError> {
    if letters.is_empty() {
        return Err(RangeError::InvalidInput(letters.to_string()));
    }

    let mut index: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(RangeError::InvalidInput(letters.to_string()));
        }
        let digit = (ch.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        index = index
            .checked_mul(26)
            .and_then(|i| i.checked_add(digit))
            .ok_or_else(|| RangeError::InvalidInput(letters.to_string()))?;
    }

    Ok(index - 1)
}

pub fn index_to_column_letters(index: u64) -> String {
    let mut letters = Vec::new();
    let mut i = i128::from(index);
    while i >= 0 {
        letters.push((b'A' + (i % 26) as u8) as char);
        i = i / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Zero-based column and row to a cell label such as `B2`. Takes `u64` so
/// offsets added to a `u32` grid origin cannot overflow.
pub fn cell_label(column_index: u64, row_index: u64) -> String {
    format!("{}{}", index_to_column_letters(column_index), row_index + 1)
}

/// Undo `qualify`: drop one pair of surrounding quotes and unescape `''`.
fn unquote_sheet(sheet: &str) -> String {
    match sheet.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => sheet.to_string(),
    }
}

/// Sheet part of a location string (`"Sheet1!A1"` -> `"Sheet1"`), empty when absent.
pub fn sheet_of(location: &str) -> String {
    location
        .split_once('!')
        .map(|(sheet, _)| unquote_sheet(sheet))
        .unwrap_or_default()
}

/// Prefix a cell reference with a sheet name, quoting names that need it.
pub fn qualify(sheet_name: &str, reference: &str) -> String {
    let plain = sheet_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        format!("{}!{}", sheet_name, reference)
    } else {
        format!("'{}'!{}", sheet_name.replace('\'', "''"), reference)
    }
}

fn cell_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z]+)(\d+)(?::([A-Za-z]+)(\d+))?$").expect("static pattern compiles")
    })
}

pub fn parse_range(reference: &str) -> Result<GridRange, RangeError> {
    let format_error = || RangeError::InvalidRangeFormat(reference.to_string());

    let (sheet_name, cells) = match reference.split_once('!') {
        Some((sheet, cells)) => {
            let sheet = unquote_sheet(sheet);
            ((!sheet.is_empty()).then_some(sheet), cells)
        }
        None => (None, reference),
    };

    let caps = cell_pattern().captures(cells).ok_or_else(format_error)?;
    let row = |m: regex::Match<'_>| -> Result<u32, RangeError> {
        match m.as_str().parse::<u32>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(format_error()),
        }
    };

    let start_column_index = column_letters_to_index(&caps[1])?;
    let start_row_index = row(caps.get(2).ok_or_else(format_error)?)? - 1;

    let (end_column_index, end_row_index) = match (caps.get(3), caps.get(4)) {
        (Some(col), Some(end_row)) => (column_letters_to_index(col.as_str())? + 1, row(end_row)?),
        _ => (start_column_index + 1, start_row_index + 1),
    };

    if end_row_index <= start_row_index || end_column_index <= start_column_index {
        return Err(format_error());
    }

    Ok(GridRange {
        sheet_name,
        start_row_index,
        end_row_index,
        start_column_index,
        end_column_index,
    })
}

impl FromStr for GridRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_range(s)
    }
}

impl GridRange {
    pub fn to_sheet_range(&self, sheet_id: i32) -> SheetRange {
        SheetRange {
            sheet_id: Some(sheet_id),
            start_row_index: Some(self.start_row_index),
            end_row_index: Some(self.end_row_index),
            start_column_index: Some(self.start_column_index),
            end_column_index: Some(self.end_column_index),
        }
    }

    /// The same rows across every column of the sheet.
    pub fn full_rows(&self, sheet_id: i32) -> SheetRange {
        SheetRange {
            sheet_id: Some(sheet_id),
            start_row_index: Some(self.start_row_index),
            end_row_index: Some(self.end_row_index),
            ..SheetRange::default()
        }
    }
}

impl fmt::Display for GridRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells = format!(
            "{}:{}",
            cell_label(self.start_column_index.into(), self.start_row_index.into()),
            cell_label(
                u64::from(self.end_column_index).saturating_sub(1),
                u64::from(self.end_row_index).saturating_sub(1),
            )
        );
        match &self.sheet_name {
            Some(sheet) => f.write_str(&qualify(sheet, &cells)),
            None => f.write_str(&cells),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn column_letters_are_bijective_base_26() {
        assert_eq!(column_letters_to_index("A"), Ok(0));
        assert_eq!(column_letters_to_index("Z"), Ok(25));
        assert_eq!(column_letters_to_index("AA"), Ok(26));
        assert_eq!(column_letters_to_index("az"), Ok(51));
        assert_eq!(column_letters_to_index("XFD"), Ok(16383));
        assert_eq!(index_to_column_letters(0), "A");
        assert_eq!(index_to_column_letters(25), "Z");
        assert_eq!(index_to_column_letters(26), "AA");
        assert_eq!(index_to_column_letters(701), "ZZ");
        assert_eq!(index_to_column_letters(702), "AAA");
    }

    #[test]
    fn column_letters_reject_non_letters() {
        assert!(matches!(column_letters_to_index("A1"), Err(RangeError::InvalidInput(_))));
        assert!(matches!(column_letters_to_index(""), Err(RangeError::InvalidInput(_))));
        assert!(matches!(column_letters_to_index("É"), Err(RangeError::InvalidInput(_))));
    }

    proptest! {
        #[test]
        fn column_round_trip(n in 0u32..10_000_000) {
            prop_assert_eq!(column_letters_to_index(&index_to_column_letters(u64::from(n))), Ok(n));
        }
    }

    #[test]
    fn single_cell_is_one_by_one() {
        let grid = parse_range("A1").unwrap();
        assert_eq!(
            grid,
            GridRange {
                sheet_name: None,
                start_row_index: 0,
                end_row_index: 1,
                start_column_index: 0,
                end_column_index: 1,
            }
        );
    }

    #[test]
    fn sheet_qualified_range() {
        let grid = parse_range("Sheet1!B2:D4").unwrap();
        assert_eq!(grid.sheet_name.as_deref(), Some("Sheet1"));
        assert_eq!((grid.start_row_index, grid.end_row_index), (1, 4));
        assert_eq!((grid.start_column_index, grid.end_column_index), (1, 4));
    }

    #[test]
    fn quoted_sheet_names_and_lowercase_columns() {
        let grid: GridRange = "'Rent Tracker'!c5".parse().unwrap();
        assert_eq!(grid.sheet_name.as_deref(), Some("Rent Tracker"));
        assert_eq!(grid.start_column_index, 2);
        assert_eq!(grid.start_row_index, 4);
        assert_eq!(grid.to_string(), "'Rent Tracker'!C5:C5");
    }

    #[test]
    fn malformed_references_fail() {
        for bad in ["NotAValidRange", "A0", "A1:B", "Sheet1!", "1A", "A:C", "B5:A1"] {
            assert!(
                matches!(parse_range(bad), Err(RangeError::InvalidRangeFormat(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn sheet_of_and_qualify() {
        assert_eq!(sheet_of("Inventory!D7"), "Inventory");
        assert_eq!(sheet_of("D7"), "");
        assert_eq!(qualify("Audit_Log", "A:G"), "Audit_Log!A:G");
        assert_eq!(qualify("Rent Tracker", "A1"), "'Rent Tracker'!A1");
    }

    #[test]
    fn escaped_quotes_in_sheet_names_round_trip() {
        assert_eq!(sheet_of("'O''Brien'!A12"), "O'Brien");
        assert_eq!(sheet_of("'Rent Tracker'!B2"), "Rent Tracker");

        let grid = parse_range("'O''Brien'!A12").unwrap();
        assert_eq!(grid.sheet_name.as_deref(), Some("O'Brien"));
        assert_eq!(grid.start_row_index, 11);
        assert_eq!(grid.to_string(), "'O''Brien'!A12:A12");
        assert_eq!(qualify(&sheet_of("'O''Brien'!A12"), "A12"), "'O''Brien'!A12");
    }

    #[test]
    fn labels_past_the_u32_grid_do_not_overflow() {
        assert_eq!(cell_label(0, u64::from(u32::MAX)), "A4294967296");
        assert_eq!(cell_label(u64::from(u32::MAX) + 1, 0), format!("{}1", index_to_column_letters(1 << 32)));
    }

    #[test]
    fn sheet_ranges_carry_sheet_id() {
        let grid = parse_range("B2:C3").unwrap();
        let api = grid.full_rows(7);
        assert_eq!(api.sheet_id, Some(7));
        assert_eq!(api.start_row_index, Some(1));
        assert_eq!(api.start_column_index, None);
        let json = serde_json::to_value(grid.to_sheet_range(7)).unwrap();
        assert_eq!(json["endColumnIndex"], 3);
    }
}
