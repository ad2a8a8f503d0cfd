use anyhow::Result;
use serde_json::{json, Value};

use super::Context;
use crate::args::DimensionArg;
use crate::input::InputError;
use crate::range::column_letters_to_index;
use crate::requests::{
    AutoResizeDimensionsRequest, BatchRequest, Dimension, DimensionProperties, DimensionRange, GridProperties,
    SheetProperties, UpdateDimensionPropertiesRequest, UpdateSheetPropertiesRequest,
};
use crate::sheets::sheet_id_by_name;

fn row_number(raw: &str) -> Result<u32, InputError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(InputError::InvalidRow(raw.to_string())),
    }
}

/// Columns by letter (`A`..`C`) or rows by 1-based number, inclusive, as a
/// half-open zero-based span.
fn dimension_span(dimension: DimensionArg, start: &str, end: &str) -> Result<(Dimension, u32, u32)> {
    match dimension {
        DimensionArg::Cols => Ok((
            Dimension::Columns,
            column_letters_to_index(start)?,
            column_letters_to_index(end)? + 1,
        )),
        DimensionArg::Rows => Ok((Dimension::Rows, row_number(start)? - 1, row_number(end)?)),
    }
}

pub async fn resize(
    ctx: &Context,
    spreadsheet_id: &str,
    sheet_name: &str,
    dimension: DimensionArg,
    start: &str,
    end: &str,
    pixels: u32,
) -> Result<Value> {
    let (dimension, start_index, end_index) = dimension_span(dimension, start, end)?;
    let sheet_id = sheet_id_by_name(ctx.api.as_ref(), spreadsheet_id, sheet_name).await?;

    let request = UpdateDimensionPropertiesRequest {
        range: DimensionRange {
            sheet_id,
            dimension,
            start_index,
            end_index,
        },
        properties: DimensionProperties { pixel_size: pixels },
        fields: "pixelSize".to_string(),
    };
    let response = ctx
        .api
        .batch_update(spreadsheet_id, &[BatchRequest::UpdateDimensionProperties(request)])
        .await?;
    Ok(json!({ "resized": true, "replies": response["replies"] }))
}

pub async fn auto_resize(
    ctx: &Context,
    spreadsheet_id: &str,
    sheet_name: &str,
    start_col: &str,
    end_col: &str,
) -> Result<Value> {
    let (dimension, start_index, end_index) = dimension_span(DimensionArg::Cols, start_col, end_col)?;
    let sheet_id = sheet_id_by_name(ctx.api.as_ref(), spreadsheet_id, sheet_name).await?;

    let request = AutoResizeDimensionsRequest {
        dimensions: DimensionRange {
            sheet_id,
            dimension,
            start_index,
            end_index,
        },
    };
    let response = ctx
        .api
        .batch_update(spreadsheet_id, &[BatchRequest::AutoResizeDimensions(request)])
        .await?;
    Ok(json!({ "autoResized": true, "replies": response["replies"] }))
}

pub async fn freeze(
    ctx: &Context,
    spreadsheet_id: &str,
    sheet_name: &str,
    rows: Option<u32>,
    cols: Option<u32>,
) -> Result<Value> {
    if rows.is_none() && cols.is_none() {
        anyhow::bail!("freeze needs a row count and/or a column count");
    }
    let sheet_id = sheet_id_by_name(ctx.api.as_ref(), spreadsheet_id, sheet_name).await?;

    let mut fields = Vec::new();
    if rows.is_some() {
        fields.push("gridProperties.frozenRowCount");
    }
    if cols.is_some() {
        fields.push("gridProperties.frozenColumnCount");
    }

    let request = UpdateSheetPropertiesRequest {
        properties: SheetProperties {
            sheet_id: Some(sheet_id),
            grid_properties: Some(GridProperties {
                frozen_row_count: rows,
                frozen_column_count: cols,
            }),
            ..SheetProperties::default()
        },
        fields: fields.join(","),
    };
    let response = ctx
        .api
        .batch_update(spreadsheet_id, &[BatchRequest::UpdateSheetProperties(request)])
        .await?;
    Ok(json!({ "frozen": true, "replies": response["replies"] }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use crate::testing::FakeSheets;
    use std::sync::Arc;

    fn sent(fake: &FakeSheets) -> Value {
        serde_json::to_value(fake.batch_requests()).unwrap()
    }

    #[test]
    fn spans_are_inclusive_and_zero_based() {
        let (dim, start, end) = dimension_span(DimensionArg::Cols, "B", "D").unwrap();
        assert_eq!((dim, start, end), (Dimension::Columns, 1, 4));
        let (dim, start, end) = dimension_span(DimensionArg::Rows, "1", "3").unwrap();
        assert_eq!((dim, start, end), (Dimension::Rows, 0, 3));
        assert!(dimension_span(DimensionArg::Rows, "0", "3").is_err());
        assert!(dimension_span(DimensionArg::Cols, "1", "C").is_err());
    }

    #[tokio::test]
    async fn resize_rows_sets_pixel_size() {
        let fake = Arc::new(FakeSheets::new().with_sheets(&[("Data", 9)]));
        resize(&context(&fake), "ss", "Data", DimensionArg::Rows, "2", "5", 40).await.unwrap();
        assert_eq!(
            sent(&fake),
            json!([{ "updateDimensionProperties": {
                "range": { "sheetId": 9, "dimension": "ROWS", "startIndex": 1, "endIndex": 5 },
                "properties": { "pixelSize": 40 },
                "fields": "pixelSize"
            }}])
        );
    }

    #[tokio::test]
    async fn auto_resize_targets_columns() {
        let fake = Arc::new(FakeSheets::new().with_sheets(&[("Data", 9)]));
        auto_resize(&context(&fake), "ss", "Data", "A", "C").await.unwrap();
        assert_eq!(
            sent(&fake)[0]["autoResizeDimensions"]["dimensions"],
            json!({ "sheetId": 9, "dimension": "COLUMNS", "startIndex": 0, "endIndex": 3 })
        );
    }

    #[tokio::test]
    async fn freeze_masks_only_given_counts() {
        let fake = Arc::new(FakeSheets::new().with_sheets(&[("Data", 9)]));
        freeze(&context(&fake), "ss", "Data", Some(1), None).await.unwrap();
        assert_eq!(
            sent(&fake)[0]["updateSheetProperties"],
            json!({
                "properties": { "sheetId": 9, "gridProperties": { "frozenRowCount": 1 } },
                "fields": "gridProperties.frozenRowCount"
            })
        );

        assert!(freeze(&context(&fake), "ss", "Data", None, None).await.is_err());
    }
}
