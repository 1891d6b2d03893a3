//! Sink writer: NDJSON temp file, then hand-off to the storage sink.

use crate::filter::FilteredRecordStream;
use crate::utils::ndjson;
use crate::{ConnectorError, ConnectorResult, StorageSink};
use std::io::{BufWriter, Write};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Outcome of a successful write-and-upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    /// Records written to the file
    pub records: usize,
    /// Size of the uploaded file in bytes
    pub bytes: u64,
    /// Destination bucket
    pub bucket: String,
    /// Destination key
    pub key: String,
}

/// Writes a [`FilteredRecordStream`] to a scoped temp file and uploads it
#[derive(Debug, Clone)]
pub struct SinkWriter {
    label: String,
}

impl SinkWriter {
    /// Create a writer; `label` names the temp file (usually the `output` key)
    pub fn new(label: impl AsRef<str>) -> Self {
        Self {
            label: temp_file_label(label.as_ref()),
        }
    }

    /// Serialize `stream` to NDJSON and upload it to `bucket`/`destination_key`
    ///
    /// The upload always replaces an existing object. The temp file is removed
    /// and `sink.close()` is called on every exit path.
    ///
    /// # Errors
    ///
    /// - `Io` / `Serialization` while writing the temp file
    /// - `Upload` when the sink fails
    pub async fn write_and_upload<S: StorageSink + ?Sized>(
        &self,
        stream: &FilteredRecordStream,
        destination_key: &str,
        bucket: &str,
        sink: &mut S,
    ) -> ConnectorResult<UploadReport> {
        let result = self.write_then_upload(stream, destination_key, bucket, &*sink).await;

        if let Err(e) = sink.close().await {
            warn!("Failed to close storage connection: {}", e);
        }

        result
    }

    async fn write_then_upload<S: StorageSink + ?Sized>(
        &self,
        stream: &FilteredRecordStream,
        destination_key: &str,
        bucket: &str,
        sink: &S,
    ) -> ConnectorResult<UploadReport> {
        // Dropping `tmp` deletes the file, whichever way this function returns.
        let tmp = tempfile::Builder::new()
            .prefix(&self.label)
            .suffix(".jsonl")
            .tempfile()?;

        let bytes = write_stream(&tmp, stream)?;
        debug!(
            "Wrote {} records ({} bytes) to {}",
            stream.len(),
            bytes,
            tmp.path().display()
        );

        info!("Uploading to s3://{}/{}", bucket, destination_key);
        sink.upload(tmp.path(), destination_key, bucket, true)
            .await
            .map_err(|e| match e {
                e @ ConnectorError::Upload { .. } => e,
                other => ConnectorError::upload_with_source(
                    format!("Upload to s3://{}/{} failed", bucket, destination_key),
                    other,
                ),
            })?;

        info!(
            "Uploaded {} records to s3://{}/{}",
            stream.len(),
            bucket,
            destination_key
        );

        Ok(UploadReport {
            records: stream.len(),
            bytes,
            bucket: bucket.to_string(),
            key: destination_key.to_string(),
        })
    }
}

fn write_stream(tmp: &NamedTempFile, stream: &FilteredRecordStream) -> ConnectorResult<u64> {
    let mut writer = BufWriter::new(tmp.as_file());
    let bytes = ndjson::write_records(&mut writer, stream)?;
    writer.flush()?;
    tmp.as_file().sync_all()?;
    Ok(bytes)
}

/// Reduce a destination key to something safe for a temp-file prefix
fn temp_file_label(output: &str) -> String {
    let name = output.rsplit('/').next().unwrap_or_default();
    let name = name.split('.').next().unwrap_or_default();
    let label: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    if label.is_empty() {
        "intercom-".to_string()
    } else {
        format!("{}-", label)
    }
}
