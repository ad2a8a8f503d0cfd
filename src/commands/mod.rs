use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::args::Command;
use crate::gate::ChangeGate;
use crate::input::split_ranges;
use crate::sheets::{ReadOptions, SheetsApi, WriteOptions};

mod format;
mod layout;
mod manage;
mod values;

/// What every command runs against: the client for its scope and the gate
/// that audits writes.
pub struct Context {
    pub api: Arc<dyn SheetsApi>,
    pub gate: ChangeGate,
}

fn to_json<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn read_options(major: Option<String>, render: Option<String>, date: Option<String>) -> ReadOptions {
    ReadOptions {
        major_dimension: major,
        value_render_option: render,
        date_time_render_option: date,
    }
}

pub async fn run(command: Command, ctx: &Context) -> Result<Value> {
    match command {
        Command::Read { spreadsheet_id, range, major, render, date, full } => {
            values::read(ctx, &spreadsheet_id, &range, &read_options(major, render, date), full).await
        }
        Command::Write { spreadsheet_id, range, values, input, major } => {
            let opts = WriteOptions {
                value_input_option: input,
                insert_data_option: None,
            };
            values::write(ctx, &spreadsheet_id, &range, &values, opts, major).await
        }
        Command::Append { spreadsheet_id, range, values, input, insert, major } => {
            let opts = WriteOptions {
                value_input_option: input,
                insert_data_option: Some(insert),
            };
            values::append(ctx, &spreadsheet_id, &range, &values, opts, major).await
        }
        Command::Clear { spreadsheet_id, range } => values::clear(ctx, &spreadsheet_id, &range).await,
        Command::BatchGet { spreadsheet_id, ranges, major, render, date } => {
            let ranges = split_ranges(&ranges);
            values::batch_get(ctx, &spreadsheet_id, &ranges, &read_options(major, render, date)).await
        }
        Command::BatchWrite { spreadsheet_id, body } => values::batch_write(ctx, &spreadsheet_id, &body).await,
        Command::Highlight { spreadsheet_id, range } => {
            values::mark_row(ctx, &spreadsheet_id, &range, values::RowMark::Unavailable).await
        }
        Command::Unhighlight { spreadsheet_id, range } => {
            values::mark_row(ctx, &spreadsheet_id, &range, values::RowMark::Cleared).await
        }
        Command::Format { spreadsheet_id, range, format } => {
            format::format(ctx, &spreadsheet_id, &range, &format).await
        }
        Command::GetFormat { spreadsheet_id, range } => format::get_format(ctx, &spreadsheet_id, &range).await,
        Command::Borders { spreadsheet_id, range, style } => {
            format::borders(ctx, &spreadsheet_id, &range, style.as_deref()).await
        }
        Command::Merge { spreadsheet_id, range, merge_type } => {
            format::merge(ctx, &spreadsheet_id, &range, &merge_type).await
        }
        Command::Unmerge { spreadsheet_id, range } => format::unmerge(ctx, &spreadsheet_id, &range).await,
        Command::CopyFormat { spreadsheet_id, source, destination } => {
            format::copy_format(ctx, &spreadsheet_id, &source, &destination).await
        }
        Command::Resize { spreadsheet_id, sheet_name, dimension, start, end, pixels } => {
            layout::resize(ctx, &spreadsheet_id, &sheet_name, dimension, &start, &end, pixels).await
        }
        Command::AutoResize { spreadsheet_id, sheet_name, start_col, end_col } => {
            layout::auto_resize(ctx, &spreadsheet_id, &sheet_name, &start_col, &end_col).await
        }
        Command::Freeze { spreadsheet_id, sheet_name, rows, cols } => {
            layout::freeze(ctx, &spreadsheet_id, &sheet_name, rows, cols).await
        }
        Command::Create { title } => manage::create(ctx, &title).await,
        Command::Info { spreadsheet_id } => manage::info(ctx, &spreadsheet_id).await,
        Command::AddSheet { spreadsheet_id, title } => manage::add_sheet(ctx, &spreadsheet_id, &title).await,
        Command::DeleteSheet { spreadsheet_id, sheet_name } => {
            manage::delete_sheet(ctx, &spreadsheet_id, &sheet_name).await
        }
        Command::RenameSheet { spreadsheet_id, old_name, new_name } => {
            manage::rename_sheet(ctx, &spreadsheet_id, &old_name, &new_name).await
        }
        Command::Batch { spreadsheet_id, requests, diff_range } => {
            manage::batch(ctx, &spreadsheet_id, &requests, diff_range.as_deref()).await
        }
    }
}

pub async fn run_with_error_handling(command: Command, ctx: &Context) -> Result<Value> {
    match run(command, ctx).await {
        Ok(output) => {
            info!("Command completed");
            Ok(output)
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            Err(e)
        }
    }
}
