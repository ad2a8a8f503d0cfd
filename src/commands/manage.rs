use anyhow::Result;
use serde_json::Value;
use tracing::info;

use super::Context;
use crate::input::json_from_arg;
use crate::requests::{
    AddSheetRequest, BatchRequest, DeleteSheetRequest, SheetProperties, UpdateSheetPropertiesRequest,
};
use crate::sheets::sheet_id_by_name;

pub async fn create(ctx: &Context, title: &str) -> Result<Value> {
    info!("Creating spreadsheet {:?}", title);
    ctx.api.create_spreadsheet(title).await
}

pub async fn info(ctx: &Context, spreadsheet_id: &str) -> Result<Value> {
    ctx.api.get_spreadsheet(spreadsheet_id, &[], false).await
}

pub async fn add_sheet(ctx: &Context, spreadsheet_id: &str, title: &str) -> Result<Value> {
    let request = AddSheetRequest {
        properties: SheetProperties {
            title: Some(title.to_string()),
            ..SheetProperties::default()
        },
    };
    ctx.api.batch_update(spreadsheet_id, &[BatchRequest::AddSheet(request)]).await
}

pub async fn delete_sheet(ctx: &Context, spreadsheet_id: &str, sheet_name: &str) -> Result<Value> {
    let sheet_id = sheet_id_by_name(ctx.api.as_ref(), spreadsheet_id, sheet_name).await?;
    ctx.api
        .batch_update(spreadsheet_id, &[BatchRequest::DeleteSheet(DeleteSheetRequest { sheet_id })])
        .await
}

pub async fn rename_sheet(ctx: &Context, spreadsheet_id: &str, old_name: &str, new_name: &str) -> Result<Value> {
    let sheet_id = sheet_id_by_name(ctx.api.as_ref(), spreadsheet_id, old_name).await?;
    let request = UpdateSheetPropertiesRequest {
        properties: SheetProperties {
            sheet_id: Some(sheet_id),
            title: Some(new_name.to_string()),
            ..SheetProperties::default()
        },
        fields: "title".to_string(),
    };
    ctx.api
        .batch_update(spreadsheet_id, &[BatchRequest::UpdateSheetProperties(request)])
        .await
}

/// Caller-supplied structural requests, audited against `diff_range` when given.
pub async fn batch(ctx: &Context, spreadsheet_id: &str, raw: &str, diff_range: Option<&str>) -> Result<Value> {
    let requests = BatchRequest::parse_all(json_from_arg(raw, "requests").await?)?;
    info!("Submitting {} request(s)", requests.len());

    let api = ctx.api.as_ref();
    ctx.gate
        .execute_with_audit_for_batch(spreadsheet_id, diff_range, &requests, || {
            api.batch_update(spreadsheet_id, &requests)
        })
        .await
}
