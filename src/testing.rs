use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashMap;

use crate::requests::BatchRequest;
use crate::sheets::{ReadOptions, SheetsApi, ValueRange, WriteOptions};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetValues { spreadsheet_id: String, range: String },
    BatchGetValues { spreadsheet_id: String, ranges: Vec<String> },
    UpdateValues { spreadsheet_id: String, range: String, values: Vec<Vec<Value>> },
    AppendValues { spreadsheet_id: String, range: String, values: Vec<Vec<Value>>, input: String },
    ClearValues { spreadsheet_id: String, range: String },
    BatchUpdateValues { spreadsheet_id: String, body: Value },
    BatchUpdate { spreadsheet_id: String, requests: Vec<BatchRequest> },
    GetSpreadsheet { spreadsheet_id: String },
    CreateSpreadsheet { title: String },
}

impl Call {
    fn is_write(&self) -> bool {
        !matches!(
            self,
            Call::GetValues { .. } | Call::BatchGetValues { .. } | Call::GetSpreadsheet { .. }
        )
    }
}

/// In-memory spreadsheet service that records every call.
#[derive(Default)]
pub struct FakeSheets {
    cells: RefCell<HashMap<(String, String), Vec<Vec<Value>>>>,
    sheets: Vec<(String, i32)>,
    appended_range: Option<String>,
    fail_reads: bool,
    fail_appends: bool,
    calls: RefCell<Vec<Call>>,
}

impl FakeSheets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(self, spreadsheet_id: &str, range: &str, rows: Vec<Vec<Value>>) -> Self {
        self.cells
            .borrow_mut()
            .insert((spreadsheet_id.to_string(), range.to_string()), rows);
        self
    }

    pub fn with_sheets(mut self, sheets: &[(&str, i32)]) -> Self {
        self.sheets = sheets.iter().map(|(t, id)| (t.to_string(), *id)).collect();
        self
    }

    pub fn with_appended_range(mut self, range: &str) -> Self {
        self.appended_range = Some(range.to_string());
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_appends(mut self) -> Self {
        self.fail_appends = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn write_count(&self) -> usize {
        self.calls.borrow().iter().filter(|c| c.is_write()).count()
    }

    /// Rows appended to one spreadsheet, in order.
    pub fn appended_rows(&self, spreadsheet_id: &str) -> Vec<Vec<Value>> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::AppendValues { spreadsheet_id: id, values, .. } if id == spreadsheet_id => {
                    Some(values.clone())
                }
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn batch_requests(&self) -> Vec<BatchRequest> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::BatchUpdate { requests, .. } => Some(requests.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

#[async_trait(?Send)]
impl SheetsApi for FakeSheets {
    async fn get_values(&self, spreadsheet_id: &str, range: &str, _opts: &ReadOptions) -> Result<ValueRange> {
        self.record(Call::GetValues {
            spreadsheet_id: spreadsheet_id.to_string(),
            range: range.to_string(),
        });
        if self.fail_reads {
            anyhow::bail!("read of {} refused", range);
        }
        let rows = self
            .cells
            .borrow()
            .get(&(spreadsheet_id.to_string(), range.to_string()))
            .cloned();
        Ok(ValueRange {
            range: Some(range.to_string()),
            major_dimension: Some("ROWS".to_string()),
            values: rows,
        })
    }

    async fn batch_get_values(&self, spreadsheet_id: &str, ranges: &[String], _opts: &ReadOptions) -> Result<Value> {
        self.record(Call::BatchGetValues {
            spreadsheet_id: spreadsheet_id.to_string(),
            ranges: ranges.to_vec(),
        });
        Ok(json!({ "spreadsheetId": spreadsheet_id, "valueRanges": [] }))
    }

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        body: ValueRange,
        _opts: &WriteOptions,
    ) -> Result<Value> {
        let rows = body.values.unwrap_or_default();
        self.record(Call::UpdateValues {
            spreadsheet_id: spreadsheet_id.to_string(),
            range: range.to_string(),
            values: rows.clone(),
        });
        self.cells
            .borrow_mut()
            .insert((spreadsheet_id.to_string(), range.to_string()), rows);
        Ok(json!({ "updatedRange": range }))
    }

    async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        body: ValueRange,
        opts: &WriteOptions,
    ) -> Result<Value> {
        self.record(Call::AppendValues {
            spreadsheet_id: spreadsheet_id.to_string(),
            range: range.to_string(),
            values: body.values.unwrap_or_default(),
            input: opts.value_input_option.clone(),
        });
        if self.fail_appends {
            anyhow::bail!("append to {} refused", range);
        }
        let updated = self.appended_range.clone().unwrap_or_else(|| range.to_string());
        Ok(json!({ "updates": { "updatedRange": updated } }))
    }

    async fn clear_values(&self, spreadsheet_id: &str, range: &str) -> Result<Value> {
        self.record(Call::ClearValues {
            spreadsheet_id: spreadsheet_id.to_string(),
            range: range.to_string(),
        });
        self.cells
            .borrow_mut()
            .remove(&(spreadsheet_id.to_string(), range.to_string()));
        Ok(json!({ "clearedRange": range }))
    }

    async fn batch_update_values(&self, spreadsheet_id: &str, body: Value) -> Result<Value> {
        self.record(Call::BatchUpdateValues {
            spreadsheet_id: spreadsheet_id.to_string(),
            body,
        });
        Ok(json!({ "spreadsheetId": spreadsheet_id }))
    }

    async fn batch_update(&self, spreadsheet_id: &str, requests: &[BatchRequest]) -> Result<Value> {
        self.record(Call::BatchUpdate {
            spreadsheet_id: spreadsheet_id.to_string(),
            requests: requests.to_vec(),
        });
        Ok(json!({ "spreadsheetId": spreadsheet_id, "replies": [] }))
    }

    async fn get_spreadsheet(&self, spreadsheet_id: &str, _ranges: &[String], _include_grid_data: bool) -> Result<Value> {
        self.record(Call::GetSpreadsheet {
            spreadsheet_id: spreadsheet_id.to_string(),
        });
        let sheets: Vec<Value> = self
            .sheets
            .iter()
            .map(|(title, id)| json!({ "properties": { "title": title, "sheetId": id } }))
            .collect();
        Ok(json!({ "spreadsheetId": spreadsheet_id, "sheets": sheets }))
    }

    async fn create_spreadsheet(&self, title: &str) -> Result<Value> {
        self.record(Call::CreateSpreadsheet { title: title.to_string() });
        Ok(json!({ "spreadsheetId": "new", "properties": { "title": title } }))
    }
}
