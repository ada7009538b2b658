use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::model::coerce_amount;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("empty upload")]
    Empty,

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid CSV upload: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid JSON upload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse an uploaded file into raw transaction records.
///
/// The format is chosen by file extension; files without a recognized
/// extension are sniffed (a leading `{` or `[` means JSON, anything else is
/// treated as CSV).
pub fn records_from_upload(file_name: &str, bytes: &[u8]) -> Result<Vec<Value>, IngestError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(IngestError::Empty);
    }

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("csv") => records_from_csv(bytes),
        Some("json") | Some("txt") => records_from_json(bytes),
        _ => match bytes.iter().find(|b| !b.is_ascii_whitespace()).copied() {
            Some(b'{') | Some(b'[') => records_from_json(bytes),
            _ => records_from_csv(bytes),
        },
    }
}

/// One record per CSV row, keyed by the header row. The `amount` column is
/// coerced to a number with a 0.0 fallback; all other columns pass through
/// as strings.
pub fn records_from_csv(bytes: &[u8]) -> Result<Vec<Value>, IngestError> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut record = Map::new();
        for (header, field) in headers.iter().zip(row.iter()) {
            let value = if header == "amount" {
                let amount = coerce_amount(&Value::String(field.to_string()));
                Number::from_f64(amount)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::Number(Number::from(0)))
            } else {
                Value::String(field.to_string())
            };
            record.insert(header.to_string(), value);
        }
        records.push(Value::Object(record));
    }

    Ok(records)
}

/// Accepts a top-level array, an object with a `transactions` array, or a
/// single object treated as one record.
pub fn records_from_json(bytes: &[u8]) -> Result<Vec<Value>, IngestError> {
    let value: Value = serde_json::from_slice(bytes)?;
    match value {
        Value::Array(records) => Ok(records),
        Value::Object(ref map) if map.contains_key("transactions") => {
            match map.get("transactions") {
                Some(Value::Array(records)) => Ok(records.clone()),
                _ => Err(IngestError::UnsupportedFormat(
                    "the transactions field must be an array".to_string(),
                )),
            }
        }
        Value::Object(_) => Ok(vec![value]),
        other => Err(IngestError::UnsupportedFormat(format!(
            "top-level JSON must be an object or array, got {}",
            other
        ))),
    }
}
