use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cfg::AuditConfig;
use crate::range::qualify;
use crate::sheets::{SheetsApi, ValueRange, WriteOptions};

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit spreadsheet is not configured")]
    NotConfigured,
    #[error("failed to append audit row: {0}")]
    Append(#[source] anyhow::Error),
}

/// One row of the audit sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub sheet: String,
    pub cell: String,
    pub old_value: String,
    pub new_value: String,
    pub source: String,
}

impl AuditEntry {
    pub fn new(
        actor: &str,
        sheet: &str,
        cell: &str,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
        source: &str,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            actor: actor.to_string(),
            sheet: sheet.to_string(),
            cell: cell.to_string(),
            old_value: old_value.into(),
            new_value: new_value.into(),
            source: source.to_string(),
        }
    }

    pub fn is_change(&self) -> bool {
        self.old_value != self.new_value
    }

    /// Timestamp, Actor, Sheet, Cell, OldValue, NewValue, Source.
    pub fn to_row(&self) -> Vec<Value> {
        let or_default = |s: &str, default: &str| {
            if s.is_empty() { default.to_string() } else { s.to_string() }
        };
        vec![
            format_timestamp(&self.timestamp),
            or_default(&self.actor, "unknown"),
            self.sheet.clone(),
            self.cell.clone(),
            self.old_value.clone(),
            self.new_value.clone(),
            or_default(&self.source, "sheets-cli"),
        ]
        .into_iter()
        .map(Value::String)
        .collect()
    }
}

/// `M/D/YYYY H:mm:ss`, no zero padding on month, day or hour.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%-m/%-d/%Y %-H:%M:%S").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    Appended,
    Unchanged,
}

pub struct AuditLogger {
    api: Arc<dyn SheetsApi>,
    cfg: AuditConfig,
}

impl AuditLogger {
    pub fn new(api: Arc<dyn SheetsApi>, cfg: AuditConfig) -> Self {
        Self { api, cfg }
    }

    pub fn actor(&self) -> &str {
        &self.cfg.actor
    }

    pub fn source(&self) -> &str {
        &self.cfg.source
    }

    pub async fn log(&self, entry: &AuditEntry) -> Result<AuditOutcome, AuditError> {
        if !entry.is_change() {
            debug!("No change at {}, nothing to audit", entry.cell);
            return Ok(AuditOutcome::Unchanged);
        }

        let spreadsheet_id = self.cfg.spreadsheet_id.as_deref().ok_or(AuditError::NotConfigured)?;
        let range = qualify(&self.cfg.sheet_name, "A:G");

        self.api
            .append_values(
                spreadsheet_id,
                &range,
                ValueRange::from_rows(vec![entry.to_row()]),
                &WriteOptions::raw(),
            )
            .await
            .map_err(AuditError::Append)?;

        info!("Audit: {} {:?} -> {:?}", entry.cell, entry.old_value, entry.new_value);
        Ok(AuditOutcome::Appended)
    }

    /// Like `log`, but a failure is only reported, never returned.
    pub async fn record(&self, entry: &AuditEntry) {
        if let Err(e) = self.log(entry).await {
            warn!("Audit log skipped for {}: {}", entry.cell, e);
        }
    }
}
