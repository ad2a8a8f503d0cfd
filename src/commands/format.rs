use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::Context;
use crate::input::{json_from_arg, InputError};
use crate::range::{parse_range, GridRange, SheetRange};
use crate::requests::{
    BatchRequest, CellData, Channels, Color, CopyPasteRequest, MergeCellsRequest, RepeatCellRequest,
    UnmergeCellsRequest, UpdateBordersRequest,
};
use crate::sheets::resolve_sheet_id;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatOptions {
    pub background_color: Option<Channels>,
    pub text_format: Option<TextFormatOptions>,
    pub horizontal_alignment: Option<String>,
    pub vertical_alignment: Option<String>,
    pub wrap_strategy: Option<String>,
    pub number_format: Option<NumberFormat>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFormatOptions {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strikethrough: Option<bool>,
    pub font_size: Option<u32>,
    pub font_family: Option<String>,
    pub foreground_color: Option<Channels>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NumberFormat {
    #[serde(rename = "type")]
    pub kind: String,
    pub pattern: Option<String>,
}

/// A JSON object under construction together with its field mask.
struct Masked {
    prefix: &'static str,
    object: Map<String, Value>,
    fields: Vec<String>,
}

impl Masked {
    fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            object: Map::new(),
            fields: Vec::new(),
        }
    }

    fn set(&mut self, key: &str, value: Value) {
        self.object.insert(key.to_string(), value);
        self.fields.push(format!("{}.{}", self.prefix, key));
    }
}

/// `userEnteredFormat` object plus the field mask naming what it sets.
pub fn build_user_entered_format(options: &FormatOptions) -> (Value, Vec<String>) {
    let mut format = Masked::new("userEnteredFormat");

    if let Some(channels) = &options.background_color {
        format.set("backgroundColor", json!(Color::from_channels(channels)));
    }

    if let Some(text) = &options.text_format {
        let mut text_format = Masked::new("userEnteredFormat.textFormat");
        let flags = [
            ("bold", text.bold),
            ("italic", text.italic),
            ("underline", text.underline),
            ("strikethrough", text.strikethrough),
        ];
        for (key, flag) in flags {
            if let Some(flag) = flag {
                text_format.set(key, json!(flag));
            }
        }
        if let Some(size) = text.font_size {
            text_format.set("fontSize", json!(size));
        }
        if let Some(family) = text.font_family.as_deref().filter(|f| !f.is_empty()) {
            text_format.set("fontFamily", json!(family));
        }
        if let Some(channels) = &text.foreground_color {
            text_format.set("foregroundColor", json!(Color::from_channels(channels)));
        }

        format.object.insert("textFormat".to_string(), Value::Object(text_format.object));
        format.fields.extend(text_format.fields);
    }

    let alignments = [
        ("horizontalAlignment", &options.horizontal_alignment),
        ("verticalAlignment", &options.vertical_alignment),
        ("wrapStrategy", &options.wrap_strategy),
    ];
    for (key, value) in alignments {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            format.set(key, json!(value.to_uppercase()));
        }
    }

    if let Some(number) = &options.number_format {
        format.set("numberFormat", json!({ "type": number.kind, "pattern": number.pattern }));
    }

    (Value::Object(format.object), format.fields)
}

async fn sheet_range(ctx: &Context, spreadsheet_id: &str, grid: &GridRange) -> Result<SheetRange> {
    let sheet_id = resolve_sheet_id(ctx.api.as_ref(), spreadsheet_id, grid.sheet_name.as_deref()).await?;
    Ok(grid.to_sheet_range(sheet_id))
}

pub async fn format(ctx: &Context, spreadsheet_id: &str, range: &str, raw: &str) -> Result<Value> {
    let options: FormatOptions = serde_json::from_value(json_from_arg(raw, "format").await?)?;
    let grid = parse_range(range)?;
    let (user_entered_format, fields) = build_user_entered_format(&options);
    if fields.is_empty() {
        return Err(InputError::NoFormatFields.into());
    }
    debug!("Formatting {} with {}", grid, fields.join(","));

    let requests = vec![BatchRequest::RepeatCell(RepeatCellRequest {
        range: sheet_range(ctx, spreadsheet_id, &grid).await?,
        cell: CellData {
            user_entered_format: Some(user_entered_format),
            ..CellData::default()
        },
        fields: fields.join(","),
    })];

    let api = ctx.api.as_ref();
    ctx.gate
        .execute_with_audit_for_batch(spreadsheet_id, None, &requests, || {
            api.batch_update(spreadsheet_id, &requests)
        })
        .await
}

pub async fn get_format(ctx: &Context, spreadsheet_id: &str, range: &str) -> Result<Value> {
    ctx.api.get_spreadsheet(spreadsheet_id, &[range.to_string()], true).await
}

pub async fn borders(ctx: &Context, spreadsheet_id: &str, range: &str, style: Option<&str>) -> Result<Value> {
    let style = match style {
        Some(raw) => json_from_arg(raw, "borderStyle").await?,
        None => json!({ "style": "SOLID", "color": Color::rgb(0.0, 0.0, 0.0) }),
    };
    let grid = parse_range(range)?;
    let request = UpdateBordersRequest::uniform(sheet_range(ctx, spreadsheet_id, &grid).await?, style);

    let response = ctx
        .api
        .batch_update(spreadsheet_id, &[BatchRequest::UpdateBorders(request)])
        .await?;
    Ok(json!({ "updated": true, "replies": response["replies"] }))
}

pub async fn merge(ctx: &Context, spreadsheet_id: &str, range: &str, merge_type: &str) -> Result<Value> {
    let grid = parse_range(range)?;
    let request = MergeCellsRequest {
        range: sheet_range(ctx, spreadsheet_id, &grid).await?,
        merge_type: merge_type.to_uppercase(),
    };

    let response = ctx
        .api
        .batch_update(spreadsheet_id, &[BatchRequest::MergeCells(request)])
        .await?;
    Ok(json!({ "merged": true, "replies": response["replies"] }))
}

pub async fn unmerge(ctx: &Context, spreadsheet_id: &str, range: &str) -> Result<Value> {
    let grid = parse_range(range)?;
    let request = UnmergeCellsRequest {
        range: sheet_range(ctx, spreadsheet_id, &grid).await?,
    };

    let response = ctx
        .api
        .batch_update(spreadsheet_id, &[BatchRequest::UnmergeCells(request)])
        .await?;
    Ok(json!({ "unmerged": true, "replies": response["replies"] }))
}

pub async fn copy_format(ctx: &Context, spreadsheet_id: &str, source: &str, destination: &str) -> Result<Value> {
    let source: GridRange = source.parse()?;
    let destination: GridRange = destination.parse()?;
    debug!("Copying format {} -> {}", source, destination);
    let request = CopyPasteRequest {
        source: sheet_range(ctx, spreadsheet_id, &source).await?,
        destination: sheet_range(ctx, spreadsheet_id, &destination).await?,
        paste_type: "PASTE_FORMAT".to_string(),
    };

    let response = ctx
        .api
        .batch_update(spreadsheet_id, &[BatchRequest::CopyPaste(request)])
        .await?;
    Ok(json!({ "copied": true, "replies": response["replies"] }))
}
