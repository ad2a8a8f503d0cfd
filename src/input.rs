use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Missing JSON input for {0}.")]
    MissingJson(&'static str),
    #[error("JSON file not found: {0}")]
    FileNotFound(String),
    #[error("Invalid JSON for {label}: {source}")]
    InvalidJson {
        label: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} must be an array of rows, e.g. [[\"a\", 1]]")]
    NotAGrid(&'static str),
    #[error("Range {0} must name a sheet, e.g. Sheet1!A2")]
    SheetRequired(String),
    #[error("No format fields provided.")]
    NoFormatFields,
    #[error("Invalid row number: {0}")]
    InvalidRow(String),
}

/// Inline JSON, or `@path` to read it from a file.
pub async fn json_from_arg(value: &str, label: &'static str) -> Result<Value, InputError> {
    if value.trim().is_empty() {
        return Err(InputError::MissingJson(label));
    }

    let text = match value.strip_prefix('@') {
        Some(path) => {
            debug!("Reading {} from {}", label, path);
            tokio::fs::read_to_string(path)
                .await
                .map_err(|_| InputError::FileNotFound(path.to_string()))?
        }
        None => value.to_string(),
    };

    serde_json::from_str(&text).map_err(|source| InputError::InvalidJson { label, source })
}

/// Rows of cell values; `{"values": [...]}` is unwrapped.
pub fn grid_from_json(value: Value, label: &'static str) -> Result<Vec<Vec<Value>>, InputError> {
    let value = match value {
        Value::Object(mut map) if map.contains_key("values") => map.remove("values").unwrap_or(Value::Null),
        other => other,
    };

    let Value::Array(rows) = value else {
        return Err(InputError::NotAGrid(label));
    };
    rows.into_iter()
        .map(|row| match row {
            Value::Array(cells) => Ok(cells),
            _ => Err(InputError::NotAGrid(label)),
        })
        .collect()
}

/// Ranges given as separate arguments and/or comma separated.
pub fn split_ranges(args: &[String]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| arg.split(','))
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}
