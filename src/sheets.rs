use anyhow::Result;
use async_trait::async_trait;
use google_sheets4::api::{
    BatchUpdateSpreadsheetRequest, BatchUpdateValuesRequest, ClearValuesRequest, Spreadsheet,
};
use google_sheets4::{hyper, hyper_rustls, Sheets};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::auth::ScopeSet;
use crate::range::{index_to_column_letters, qualify};
use crate::requests::BatchRequest;

pub type SheetsHub = Sheets<hyper_rustls::HttpsConnector<hyper::client::HttpConnector>>;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Sheet not found: {0}")]
    NotFound(String),
    #[error("Spreadsheet has no sheets.")]
    NoSheets,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Vec<Value>>>,
}

impl ValueRange {
    pub fn from_rows(rows: Vec<Vec<Value>>) -> Self {
        Self {
            values: Some(rows),
            ..Self::default()
        }
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        self.values.as_deref().unwrap_or(&[])
    }

    /// Text of the top-left cell, empty when the range holds nothing.
    pub fn first_cell(&self) -> String {
        self.rows()
            .first()
            .and_then(|row| row.first())
            .map(cell_text)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub major_dimension: Option<String>,
    pub value_render_option: Option<String>,
    pub date_time_render_option: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub value_input_option: String,
    pub insert_data_option: Option<String>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            value_input_option: "USER_ENTERED".to_string(),
            insert_data_option: None,
        }
    }
}

impl WriteOptions {
    pub fn raw() -> Self {
        Self {
            value_input_option: "RAW".to_string(),
            insert_data_option: Some("INSERT_ROWS".to_string()),
        }
    }
}

/// The upstream spreadsheet service as the rest of the crate sees it.
#[async_trait(?Send)]
pub trait SheetsApi {
    async fn get_values(&self, spreadsheet_id: &str, range: &str, opts: &ReadOptions) -> Result<ValueRange>;

    async fn batch_get_values(&self, spreadsheet_id: &str, ranges: &[String], opts: &ReadOptions) -> Result<Value>;

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        body: ValueRange,
        opts: &WriteOptions,
    ) -> Result<Value>;

    async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        body: ValueRange,
        opts: &WriteOptions,
    ) -> Result<Value>;

    async fn clear_values(&self, spreadsheet_id: &str, range: &str) -> Result<Value>;

    async fn batch_update_values(&self, spreadsheet_id: &str, body: Value) -> Result<Value>;

    async fn batch_update(&self, spreadsheet_id: &str, requests: &[BatchRequest]) -> Result<Value>;

    async fn get_spreadsheet(&self, spreadsheet_id: &str, ranges: &[String], include_grid_data: bool) -> Result<Value>;

    async fn create_spreadsheet(&self, title: &str) -> Result<Value>;
}

/// Cell value as text: strings verbatim, numbers and booleans printed, null empty.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn convert<T: Serialize, U: DeserializeOwned>(value: T) -> Result<U> {
    Ok(serde_json::from_value(serde_json::to_value(value)?)?)
}

/// `SheetsApi` over the google-sheets4 hub, authorising every call with one scope set.
pub struct GoogleSheets {
    hub: SheetsHub,
    scopes: ScopeSet,
}

impl GoogleSheets {
    pub fn new(hub: SheetsHub, scopes: ScopeSet) -> Self {
        Self { hub, scopes }
    }
}

macro_rules! with_scopes {
    ($call:expr, $scopes:expr) => {{
        let mut call = $call;
        for scope in $scopes.iter() {
            call = call.add_scope(scope);
        }
        call
    }};
}

#[async_trait(?Send)]
impl SheetsApi for GoogleSheets {
    async fn get_values(&self, spreadsheet_id: &str, range: &str, opts: &ReadOptions) -> Result<ValueRange> {
        debug!("values.get {} {}", spreadsheet_id, range);
        let mut call = self.hub.spreadsheets().values_get(spreadsheet_id, range);
        if let Some(major) = &opts.major_dimension {
            call = call.major_dimension(major);
        }
        if let Some(render) = &opts.value_render_option {
            call = call.value_render_option(render);
        }
        if let Some(date) = &opts.date_time_render_option {
            call = call.date_time_render_option(date);
        }

        match with_scopes!(call, self.scopes).doit().await {
            Ok((_, values)) => convert(values),
            Err(e) => anyhow::bail!("Failed to read {}: {}", range, e),
        }
    }

    async fn batch_get_values(&self, spreadsheet_id: &str, ranges: &[String], opts: &ReadOptions) -> Result<Value> {
        debug!("values.batchGet {} {:?}", spreadsheet_id, ranges);
        let mut call = self.hub.spreadsheets().values_batch_get(spreadsheet_id);
        for range in ranges {
            call = call.add_ranges(range);
        }
        if let Some(major) = &opts.major_dimension {
            call = call.major_dimension(major);
        }
        if let Some(render) = &opts.value_render_option {
            call = call.value_render_option(render);
        }
        if let Some(date) = &opts.date_time_render_option {
            call = call.date_time_render_option(date);
        }

        match with_scopes!(call, self.scopes).doit().await {
            Ok((_, response)) => Ok(serde_json::to_value(response)?),
            Err(e) => anyhow::bail!("Failed to batch read {:?}: {}", ranges, e),
        }
    }

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        body: ValueRange,
        opts: &WriteOptions,
    ) -> Result<Value> {
        debug!("values.update {} {}", spreadsheet_id, range);
        let call = self
            .hub
            .spreadsheets()
            .values_update(convert(body)?, spreadsheet_id, range)
            .value_input_option(&opts.value_input_option);

        match with_scopes!(call, self.scopes).doit().await {
            Ok((_, response)) => Ok(serde_json::to_value(response)?),
            Err(e) => anyhow::bail!("Failed to write {}: {}", range, e),
        }
    }

    async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        body: ValueRange,
        opts: &WriteOptions,
    ) -> Result<Value> {
        debug!("values.append {} {}", spreadsheet_id, range);
        let mut call = self
            .hub
            .spreadsheets()
            .values_append(convert(body)?, spreadsheet_id, range)
            .value_input_option(&opts.value_input_option);
        if let Some(insert) = &opts.insert_data_option {
            call = call.insert_data_option(insert);
        }

        match with_scopes!(call, self.scopes).doit().await {
            Ok((_, response)) => Ok(serde_json::to_value(response)?),
            Err(e) => anyhow::bail!("Failed to append to {}: {}", range, e),
        }
    }

    async fn clear_values(&self, spreadsheet_id: &str, range: &str) -> Result<Value> {
        debug!("values.clear {} {}", spreadsheet_id, range);
        let call = self
            .hub
            .spreadsheets()
            .values_clear(ClearValuesRequest::default(), spreadsheet_id, range);

        match with_scopes!(call, self.scopes).doit().await {
            Ok((_, response)) => Ok(serde_json::to_value(response)?),
            Err(e) => anyhow::bail!("Failed to clear {}: {}", range, e),
        }
    }

    async fn batch_update_values(&self, spreadsheet_id: &str, body: Value) -> Result<Value> {
        let request: BatchUpdateValuesRequest = serde_json::from_value(body)?;
        let call = self.hub.spreadsheets().values_batch_update(request, spreadsheet_id);

        match with_scopes!(call, self.scopes).doit().await {
            Ok((_, response)) => Ok(serde_json::to_value(response)?),
            Err(e) => anyhow::bail!("Failed to batch write: {}", e),
        }
    }

    async fn batch_update(&self, spreadsheet_id: &str, requests: &[BatchRequest]) -> Result<Value> {
        info!("Sending {} batch request(s) to {}", requests.len(), spreadsheet_id);
        let request: BatchUpdateSpreadsheetRequest = convert(json!({ "requests": requests }))?;
        let call = self.hub.spreadsheets().batch_update(request, spreadsheet_id);

        match with_scopes!(call, self.scopes).doit().await {
            Ok((_, response)) => Ok(serde_json::to_value(response)?),
            Err(e) => anyhow::bail!("Batch update failed: {}", e),
        }
    }

    async fn get_spreadsheet(&self, spreadsheet_id: &str, ranges: &[String], include_grid_data: bool) -> Result<Value> {
        let mut call = self.hub.spreadsheets().get(spreadsheet_id);
        for range in ranges {
            call = call.add_ranges(range);
        }
        if include_grid_data {
            call = call.include_grid_data(true);
        }

        match with_scopes!(call, self.scopes).doit().await {
            Ok((_, spreadsheet)) => Ok(serde_json::to_value(spreadsheet)?),
            Err(e) => anyhow::bail!("Failed to fetch spreadsheet {}: {}", spreadsheet_id, e),
        }
    }

    async fn create_spreadsheet(&self, title: &str) -> Result<Value> {
        let request: Spreadsheet = convert(json!({ "properties": { "title": title } }))?;
        let call = self.hub.spreadsheets().create(request);

        match with_scopes!(call, self.scopes).doit().await {
            Ok((_, spreadsheet)) => Ok(serde_json::to_value(spreadsheet)?),
            Err(e) => anyhow::bail!("Failed to create spreadsheet {:?}: {}", title, e),
        }
    }
}

fn sheet_entries(spreadsheet: &Value) -> impl Iterator<Item = (&str, i32)> {
    spreadsheet["sheets"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|sheet| {
            let props = &sheet["properties"];
            let id = props["sheetId"].as_i64().unwrap_or(0) as i32;
            Some((props["title"].as_str()?, id))
        })
}

pub async fn sheet_id_by_name(api: &dyn SheetsApi, spreadsheet_id: &str, sheet_name: &str) -> Result<i32> {
    let spreadsheet = api.get_spreadsheet(spreadsheet_id, &[], false).await?;
    let found = sheet_entries(&spreadsheet).find(|(title, _)| *title == sheet_name);
    match found {
        Some((_, id)) => Ok(id),
        None => Err(SheetError::NotFound(sheet_name.to_string()).into()),
    }
}

pub async fn default_sheet_id(api: &dyn SheetsApi, spreadsheet_id: &str) -> Result<i32> {
    let spreadsheet = api.get_spreadsheet(spreadsheet_id, &[], false).await?;
    let first = sheet_entries(&spreadsheet).next();
    first.map(|(_, id)| id).ok_or_else(|| SheetError::NoSheets.into())
}

/// Named sheet when given, otherwise the first sheet of the spreadsheet.
pub async fn resolve_sheet_id(api: &dyn SheetsApi, spreadsheet_id: &str, sheet_name: Option<&str>) -> Result<i32> {
    match sheet_name {
        Some(name) => sheet_id_by_name(api, spreadsheet_id, name).await,
        None => default_sheet_id(api, spreadsheet_id).await,
    }
}

/// Write `status` into the row's "Status" column, if the sheet has one.
pub async fn update_status(
    api: &dyn SheetsApi,
    spreadsheet_id: &str,
    sheet_name: &str,
    row_number: u32,
    status: &str,
) -> Result<bool> {
    let header = api
        .get_values(spreadsheet_id, &qualify(sheet_name, "1:1"), &ReadOptions::default())
        .await?;
    let position = header
        .rows()
        .first()
        .and_then(|row| row.iter().position(|h| cell_text(h).trim().eq_ignore_ascii_case("status")));

    let Some(column) = position else {
        debug!("No Status column in {}, skipping status update", sheet_name);
        return Ok(false);
    };

    let cell = qualify(
        sheet_name,
        &format!("{}{}", index_to_column_letters(column as u64), row_number),
    );
    info!("Updating status at {} to {:?}", cell, status);
    api.update_values(
        spreadsheet_id,
        &cell,
        ValueRange::from_rows(vec![vec![json!(status)]]),
        &WriteOptions::default(),
    )
    .await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeSheets};

    #[test]
    fn cell_text_stringifies_scalars() {
        assert_eq!(cell_text(&json!("abc")), "abc");
        assert_eq!(cell_text(&json!(42)), "42");
        assert_eq!(cell_text(&json!(1.5)), "1.5");
        assert_eq!(cell_text(&json!(true)), "true");
        assert_eq!(cell_text(&Value::Null), "");
    }

    #[test]
    fn first_cell_of_empty_range_is_empty() {
        assert_eq!(ValueRange::default().first_cell(), "");
        assert_eq!(ValueRange::from_rows(vec![vec![json!(7)]]).first_cell(), "7");
    }

    #[tokio::test]
    async fn sheet_lookup_by_name_and_default() {
        let fake = FakeSheets::new().with_sheets(&[("Inventory", 11), ("Cleaning", 12)]);
        assert_eq!(sheet_id_by_name(&fake, "ss", "Cleaning").await.unwrap(), 12);
        assert_eq!(default_sheet_id(&fake, "ss").await.unwrap(), 11);

        let err = sheet_id_by_name(&fake, "ss", "Nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Sheet not found: Nope");

        let empty = FakeSheets::new();
        assert!(default_sheet_id(&empty, "ss").await.is_err());
    }

    #[tokio::test]
    async fn status_column_is_located_from_header() {
        let fake = FakeSheets::new().with_values("ss", "Inventory!1:1", vec![vec![json!("Apt"), json!(" STATUS ")]]);
        assert!(update_status(&fake, "ss", "Inventory", 9, "New").await.unwrap());
        assert!(fake.calls().contains(&Call::UpdateValues {
            spreadsheet_id: "ss".to_string(),
            range: "Inventory!B9".to_string(),
            values: vec![vec![json!("New")]],
        }));
    }

    #[tokio::test]
    async fn missing_status_column_is_skipped() {
        let fake = FakeSheets::new().with_values("ss", "Inventory!1:1", vec![vec![json!("Apt")]]);
        assert!(!update_status(&fake, "ss", "Inventory", 9, "New").await.unwrap());
        assert_eq!(fake.write_count(), 0);
    }
}
