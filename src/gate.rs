//! Read-compare-write wrappers that skip redundant writes and audit real ones.
//!
//! The read and the write are separate remote calls, so a concurrent edit
//! between them is not detected.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

use crate::audit::{AuditEntry, AuditLogger};
use crate::range::{cell_label, parse_range, sheet_of};
use crate::requests::BatchRequest;
use crate::sheets::{cell_text, ReadOptions, SheetsApi};

pub const UNCHANGED_REASON: &str = "Value unchanged";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDecision {
    pub execute: bool,
    pub old_value: String,
    pub new_value: String,
}

impl ChangeDecision {
    pub fn evaluate(old_value: String, new_value: &str) -> Self {
        Self {
            execute: old_value != new_value,
            old_value,
            new_value: new_value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skipped {
    pub skipped: bool,
    pub reason: &'static str,
}

/// Result of a gated write: the wrapped operation's value, or a skip marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GateOutcome<T> {
    Skipped(Skipped),
    Executed(T),
}

impl<T> GateOutcome<T> {
    fn unchanged() -> Self {
        GateOutcome::Skipped(Skipped {
            skipped: true,
            reason: UNCHANGED_REASON,
        })
    }
}

/// Anything submitted in a batch that may carry new cell values.
pub trait WriteRequest {
    /// `(cell label, new value)` for every cell this request writes.
    fn cell_values(&self) -> Vec<(String, String)>;
}

impl WriteRequest for BatchRequest {
    fn cell_values(&self) -> Vec<(String, String)> {
        match self {
            BatchRequest::UpdateCells(update) => update.cell_values(),
            _ => Vec::new(),
        }
    }
}

/// One `data[]` entry of a `values.batchUpdate` body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ValueWrite {
    pub range: String,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl WriteRequest for ValueWrite {
    fn cell_values(&self) -> Vec<(String, String)> {
        let origin = parse_range(&self.range)
            .map(|grid| (grid.start_row_index, grid.start_column_index))
            .ok();

        let mut cells = Vec::new();
        for (r, row) in self.values.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let label = match origin {
                    Some((row0, col0)) => cell_label(u64::from(col0) + c as u64, u64::from(row0) + r as u64),
                    None => self.range.clone(),
                };
                cells.push((label, cell_text(value)));
            }
        }
        cells
    }
}

pub struct ChangeGate {
    api: Arc<dyn SheetsApi>,
    audit: AuditLogger,
}

impl ChangeGate {
    pub fn new(api: Arc<dyn SheetsApi>, audit: AuditLogger) -> Self {
        Self { api, audit }
    }

    /// Top-left value at `location`; a failed read counts as empty.
    async fn current_value(&self, spreadsheet_id: &str, location: &str) -> String {
        match self.api.get_values(spreadsheet_id, location, &ReadOptions::default()).await {
            Ok(values) => values.first_cell(),
            Err(e) => {
                debug!("Could not read prior value at {}: {}", location, e);
                String::new()
            }
        }
    }

    /// Run `operation` only when `new_value` differs from what is stored at
    /// `location`, then audit the change. The operation receives the old value.
    pub async fn execute_with_optional_audit<T, F, Fut>(
        &self,
        spreadsheet_id: &str,
        location: &str,
        new_value: &str,
        operation: F,
    ) -> Result<GateOutcome<T>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let old_value = self.current_value(spreadsheet_id, location).await;
        let decision = ChangeDecision::evaluate(old_value, new_value);

        if !decision.execute {
            info!("Value at {} unchanged, skipping write", location);
            return Ok(GateOutcome::unchanged());
        }

        let result = operation(decision.old_value.clone()).await?;

        let entry = AuditEntry::new(
            self.audit.actor(),
            &sheet_of(location),
            location,
            decision.old_value,
            decision.new_value,
            self.audit.source(),
        );
        self.audit.record(&entry).await;

        Ok(GateOutcome::Executed(result))
    }

    /// Values currently in `range`, one per cell, row by row.
    async fn snapshot(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<String>> {
        let grid = parse_range(range)?;
        let current = self.api.get_values(spreadsheet_id, range, &ReadOptions::default()).await?;

        let mut values = Vec::new();
        for (r, row) in current.rows().iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let label = cell_label(
                    u64::from(grid.start_column_index) + c as u64,
                    u64::from(grid.start_row_index) + r as u64,
                );
                debug!("{} was {:?}", label, value);
                values.push(cell_text(value));
            }
        }
        Ok(values)
    }

    /// Always runs `operation`; afterwards writes one consolidated audit entry
    /// when the submitted cell values differ from what `diff_range` held, or
    /// when nothing could be read to compare against.
    pub async fn execute_with_audit_for_batch<R, T, F, Fut>(
        &self,
        spreadsheet_id: &str,
        diff_range: Option<&str>,
        requests: &[R],
        operation: F,
    ) -> Result<T>
    where
        R: WriteRequest,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let old_values = match diff_range {
            Some(range) => self.snapshot(spreadsheet_id, range).await.unwrap_or_else(|e| {
                debug!("Could not read prior values of {}: {}", range, e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        let result = operation().await?;

        let (new_cells, new_values): (Vec<String>, Vec<String>) =
            requests.iter().flat_map(WriteRequest::cell_values).unzip();

        let old_joined = old_values.join(", ");
        let new_joined = new_values.join(", ");
        if old_joined != new_joined || old_values.is_empty() {
            let sheet = diff_range.map(sheet_of).unwrap_or_default();
            let entry = AuditEntry::new(
                self.audit.actor(),
                &sheet,
                &new_cells.join(", "),
                old_joined,
                new_joined,
                self.audit.source(),
            );
            self.audit.record(&entry).await;
        } else {
            debug!("Batch left {} cell(s) unchanged, nothing to audit", old_values.len());
        }

        Ok(result)
    }
}
