use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::range::{cell_label, SheetRange};

/// One entry of a `spreadsheets.batchUpdate` call.
///
/// The variants the CLI builds itself are typed; anything else a caller hands
/// to `batch` is carried through verbatim as `Other`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BatchRequest {
    UpdateCells(UpdateCellsRequest),
    RepeatCell(RepeatCellRequest),
    UpdateBorders(UpdateBordersRequest),
    MergeCells(MergeCellsRequest),
    UnmergeCells(UnmergeCellsRequest),
    UpdateDimensionProperties(UpdateDimensionPropertiesRequest),
    AutoResizeDimensions(AutoResizeDimensionsRequest),
    UpdateSheetProperties(UpdateSheetPropertiesRequest),
    AddSheet(AddSheetRequest),
    DeleteSheet(DeleteSheetRequest),
    CopyPaste(CopyPasteRequest),
    #[serde(untagged)]
    Other(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Dimension {
    Rows,
    Columns,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl Color {
    pub const fn rgb(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }

    /// From 0-255 channels; missing channels count as zero.
    pub fn from_channels(channels: &Channels) -> Self {
        Self {
            red: channels.red.unwrap_or(0.0) / 255.0,
            green: channels.green.unwrap_or(0.0) / 255.0,
            blue: channels.blue.unwrap_or(0.0) / 255.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Channels {
    pub red: Option<f32>,
    pub green: Option<f32>,
    pub blue: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_value: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExtendedValue {
    /// String value first, then numeric, else empty.
    pub fn as_text(&self) -> String {
        match (&self.string_value, self.number_value) {
            (Some(s), _) => s.clone(),
            (None, Some(n)) => n.to_string(),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_entered_value: Option<ExtendedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_entered_format: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowData {
    #[serde(default)]
    pub values: Vec<CellData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCoordinate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_id: Option<i32>,
    #[serde(default)]
    pub row_index: u32,
    #[serde(default)]
    pub column_index: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCellsRequest {
    #[serde(default)]
    pub rows: Vec<RowData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<SheetRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<GridCoordinate>,
}

impl UpdateCellsRequest {
    /// `(label, value)` for every cell carrying a user-entered value.
    pub fn cell_values(&self) -> Vec<(String, String)> {
        let (row0, col0) = match (&self.range, &self.start) {
            (Some(range), _) => (
                range.start_row_index.unwrap_or(0),
                range.start_column_index.unwrap_or(0),
            ),
            (None, Some(start)) => (start.row_index, start.column_index),
            (None, None) => (0, 0),
        };

        let mut cells = Vec::new();
        for (r, row) in self.rows.iter().enumerate() {
            for (c, cell) in row.values.iter().enumerate() {
                let text = cell
                    .user_entered_value
                    .as_ref()
                    .map(ExtendedValue::as_text)
                    .unwrap_or_default();
                cells.push((cell_label(u64::from(col0) + c as u64, u64::from(row0) + r as u64), text));
            }
        }
        cells
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatCellRequest {
    pub range: SheetRange,
    pub cell: CellData,
    pub fields: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBordersRequest {
    pub range: SheetRange,
    pub top: Value,
    pub bottom: Value,
    pub left: Value,
    pub right: Value,
    pub inner_horizontal: Value,
    pub inner_vertical: Value,
}

impl UpdateBordersRequest {
    pub fn uniform(range: SheetRange, style: Value) -> Self {
        Self {
            range,
            top: style.clone(),
            bottom: style.clone(),
            left: style.clone(),
            right: style.clone(),
            inner_horizontal: style.clone(),
            inner_vertical: style,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeCellsRequest {
    pub range: SheetRange,
    pub merge_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmergeCellsRequest {
    pub range: SheetRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionRange {
    pub sheet_id: i32,
    pub dimension: Dimension,
    pub start_index: u32,
    pub end_index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionProperties {
    pub pixel_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateDimensionPropertiesRequest {
    pub range: DimensionRange,
    pub properties: DimensionProperties,
    pub fields: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoResizeDimensionsRequest {
    pub dimensions: DimensionRange,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frozen_row_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frozen_column_count: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_properties: Option<GridProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateSheetPropertiesRequest {
    pub properties: SheetProperties,
    pub fields: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddSheetRequest {
    pub properties: SheetProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSheetRequest {
    pub sheet_id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyPasteRequest {
    pub source: SheetRange,
    pub destination: SheetRange,
    pub paste_type: String,
}

impl BatchRequest {
    /// Paint every column of the given rows with a solid background.
    pub fn background(range: SheetRange, color: Color) -> Self {
        BatchRequest::RepeatCell(RepeatCellRequest {
            range,
            cell: CellData {
                user_entered_format: Some(serde_json::json!({ "backgroundColor": color })),
                ..CellData::default()
            },
            fields: "userEnteredFormat.backgroundColor".to_string(),
        })
    }

    /// Parse caller-supplied requests. Only `updateCells` is typed; every
    /// other kind is forwarded untouched.
    pub fn parse_all(payload: Value) -> anyhow::Result<Vec<BatchRequest>> {
        let items = match payload {
            Value::Array(items) => items,
            Value::Object(mut body) => match body.remove("requests") {
                Some(Value::Array(items)) => items,
                _ => anyhow::bail!("batch payload must be an array or {{\"requests\": [...]}}"),
            },
            _ => anyhow::bail!("batch payload must be an array or {{\"requests\": [...]}}"),
        };

        items
            .into_iter()
            .map(|item| -> anyhow::Result<BatchRequest> {
                match item.get("updateCells") {
                    Some(body) => Ok(BatchRequest::UpdateCells(serde_json::from_value(body.clone())?)),
                    None => Ok(BatchRequest::Other(item)),
                }
            })
            .collect()
    }
}
