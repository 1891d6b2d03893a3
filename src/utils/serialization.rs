//! Serialization helpers for newline-delimited JSON.

use crate::record::NormalizedRecord;
use std::io::{BufRead, Write};
use thiserror::Error;

/// Serialization errors
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format at line {line}: {message}")]
    InvalidFormat { line: usize, message: String },
}

/// Result type for serialization operations
pub type Result<T> = std::result::Result<T, SerializationError>;

impl From<SerializationError> for crate::ConnectorError {
    fn from(err: SerializationError) -> Self {
        match err {
            SerializationError::Io(e) => crate::ConnectorError::Io(e),
            other => crate::ConnectorError::Serialization(other.to_string()),
        }
    }
}

/// NDJSON helpers: one JSON object per line, no enclosing array
pub mod ndjson {
    use super::*;

    /// Serialize one record as a single line, newline included
    pub fn to_line(record: &NormalizedRecord) -> Result<String> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        Ok(line)
    }

    /// Write records to `writer`, one line each, in order
    ///
    /// Returns the number of bytes written.
    pub fn write_records<'a, W, I>(writer: &mut W, records: I) -> Result<u64>
    where
        W: Write,
        I: IntoIterator<Item = &'a NormalizedRecord>,
    {
        let mut written = 0u64;
        for record in records {
            let line = to_line(record)?;
            writer.write_all(line.as_bytes())?;
            written += line.len() as u64;
        }
        Ok(written)
    }

    /// Read records back from NDJSON text; blank lines are ignored
    pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<NormalizedRecord>> {
        let mut records = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<serde_json::Value>(&line)? {
                serde_json::Value::Object(map) => records.push(map),
                _ => {
                    return Err(SerializationError::InvalidFormat {
                        line: index + 1,
                        message: "expected a JSON object".to_string(),
                    })
                }
            }
        }
        Ok(records)
    }

    /// Read records back from an NDJSON string
    pub fn from_str(text: &str) -> Result<Vec<NormalizedRecord>> {
        read_records(text.as_bytes())
    }
}
