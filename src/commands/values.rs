use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{to_json, Context};
use crate::gate::ValueWrite;
use crate::input::{grid_from_json, json_from_arg, InputError};
use crate::range::parse_range;
use crate::requests::{BatchRequest, Color};
use crate::sheets::{cell_text, resolve_sheet_id, update_status, ReadOptions, ValueRange, WriteOptions};

pub const GREEN: Color = Color::rgb(146.0 / 255.0, 208.0 / 255.0, 80.0 / 255.0);
pub const YELLOW: Color = Color::rgb(1.0, 1.0, 0.0);
pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

/// Sheet whose rows are coloured and status-tracked on every write.
const INVENTORY_SHEET: &str = "inventory";

pub async fn read(ctx: &Context, spreadsheet_id: &str, range: &str, opts: &ReadOptions, full: bool) -> Result<Value> {
    let values = ctx.api.get_values(spreadsheet_id, range, opts).await?;
    debug!("Read {} row(s) from {}", values.rows().len(), range);
    if full {
        to_json(values)
    } else {
        to_json(values.rows())
    }
}

pub async fn write(
    ctx: &Context,
    spreadsheet_id: &str,
    range: &str,
    raw: &str,
    opts: WriteOptions,
    major: Option<String>,
) -> Result<Value> {
    let rows = grid_from_json(json_from_arg(raw, "values").await?, "values")?;
    let grid = parse_range(range)?;
    let new_value = rows.first().and_then(|row| row.first()).map(cell_text).unwrap_or_default();
    let row_number = grid.start_row_index + 1;

    let api = ctx.api.as_ref();
    let written = new_value.clone();
    let outcome = ctx
        .gate
        .execute_with_optional_audit(spreadsheet_id, range, &new_value, |old_value| async move {
            let body = ValueRange {
                values: Some(rows),
                major_dimension: major,
                ..ValueRange::default()
            };
            api.update_values(spreadsheet_id, range, body, &opts).await?;

            let was_empty = old_value.is_empty();
            let status = if was_empty { "New" } else { "Modified" };

            if let Some(sheet) = grid.sheet_name.as_deref().filter(|s| s.eq_ignore_ascii_case(INVENTORY_SHEET)) {
                let sheet_id = resolve_sheet_id(api, spreadsheet_id, Some(sheet)).await?;
                let color = if was_empty { GREEN } else { YELLOW };
                api.batch_update(spreadsheet_id, &[BatchRequest::background(grid.full_rows(sheet_id), color)])
                    .await?;
                update_status(api, spreadsheet_id, sheet, row_number, status).await?;
            }

            Ok::<_, anyhow::Error>(json!({
                "oldValue": old_value,
                "newValue": written,
                "rowNumber": row_number,
                "status": status,
            }))
        })
        .await?;

    to_json(outcome)
}

pub async fn append(
    ctx: &Context,
    spreadsheet_id: &str,
    range: &str,
    raw: &str,
    opts: WriteOptions,
    major: Option<String>,
) -> Result<Value> {
    let rows = grid_from_json(json_from_arg(raw, "values").await?, "values")?;
    let new_value = serde_json::to_string(&rows)?;

    let api = ctx.api.as_ref();
    let outcome = ctx
        .gate
        .execute_with_optional_audit(spreadsheet_id, range, &new_value, |_| async move {
            let body = ValueRange {
                values: Some(rows),
                major_dimension: major,
                ..ValueRange::default()
            };
            let response = api.append_values(spreadsheet_id, range, body, &opts).await?;

            let updated = response["updates"]["updatedRange"]
                .as_str()
                .ok_or_else(|| anyhow!("Append response carried no updated range"))?;
            info!("Appended rows landed at {}", updated);

            let grid = parse_range(updated)?;
            let sheet_id = resolve_sheet_id(api, spreadsheet_id, grid.sheet_name.as_deref()).await?;
            api.batch_update(spreadsheet_id, &[BatchRequest::background(grid.full_rows(sheet_id), GREEN)])
                .await?;
            if let Some(sheet) = grid.sheet_name.as_deref() {
                update_status(api, spreadsheet_id, sheet, grid.start_row_index + 1, "New").await?;
            }

            Ok::<_, anyhow::Error>(response)
        })
        .await?;

    to_json(outcome)
}

pub async fn clear(ctx: &Context, spreadsheet_id: &str, range: &str) -> Result<Value> {
    let api = ctx.api.as_ref();
    let outcome = ctx
        .gate
        .execute_with_optional_audit(spreadsheet_id, range, "", |_| async move {
            api.clear_values(spreadsheet_id, range).await
        })
        .await?;
    to_json(outcome)
}

pub async fn batch_get(ctx: &Context, spreadsheet_id: &str, ranges: &[String], opts: &ReadOptions) -> Result<Value> {
    ctx.api.batch_get_values(spreadsheet_id, ranges, opts).await
}

pub async fn batch_write(ctx: &Context, spreadsheet_id: &str, raw: &str) -> Result<Value> {
    let body = json_from_arg(raw, "batchUpdate").await?;
    let writes: Vec<ValueWrite> = match body.get("data") {
        Some(data) => serde_json::from_value(data.clone())?,
        None => Vec::new(),
    };

    let api = ctx.api.as_ref();
    ctx.gate
        .execute_with_audit_for_batch(spreadsheet_id, None, &writes, || {
            api.batch_update_values(spreadsheet_id, body)
        })
        .await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowMark {
    Unavailable,
    Cleared,
}

impl RowMark {
    fn status(self) -> &'static str {
        match self {
            RowMark::Unavailable => "Unavailable",
            RowMark::Cleared => "N/A",
        }
    }

    fn color(self) -> Color {
        match self {
            RowMark::Unavailable => RED,
            RowMark::Cleared => WHITE,
        }
    }

    fn flag(self) -> &'static str {
        match self {
            RowMark::Unavailable => "highlighted",
            RowMark::Cleared => "unhighlighted",
        }
    }
}

/// Paint the rows of `range` and set their Status, gated on the first cell.
pub async fn mark_row(ctx: &Context, spreadsheet_id: &str, range: &str, mark: RowMark) -> Result<Value> {
    let grid = parse_range(range)?;
    let sheet = grid
        .sheet_name
        .clone()
        .ok_or_else(|| InputError::SheetRequired(range.to_string()))?;
    let row_number = grid.start_row_index + 1;

    let api = ctx.api.as_ref();
    let outcome = ctx
        .gate
        .execute_with_optional_audit(spreadsheet_id, range, mark.status(), |_| async move {
            let sheet_id = resolve_sheet_id(api, spreadsheet_id, Some(sheet.as_str())).await?;
            api.batch_update(spreadsheet_id, &[BatchRequest::background(grid.full_rows(sheet_id), mark.color())])
                .await?;
            update_status(api, spreadsheet_id, &sheet, row_number, mark.status()).await?;

            let mut result = json!({ "rowNumber": row_number, "status": mark.status() });
            result[mark.flag()] = json!(true);
            Ok::<_, anyhow::Error>(result)
        })
        .await?;

    to_json(outcome)
}
