//! # Intercom S3 Connector
//!
//! Workflow operator that extracts records from the Intercom API and writes them
//! to S3 as newline-delimited JSON.
//!
//! One invocation authenticates against Intercom, invokes a single method on a
//! single resource, optionally filters the result by an integer replication
//! cursor and a field allowlist, and uploads the records as one NDJSON object.
//! Scheduling and retries belong to the workflow engine that runs the operator.
//!
//! ## Overview
//!
//! ```text
//! CredentialResolver ──► IntercomSession ──► RecordFilter ──► SinkWriter ──► S3Sink
//!                        (ApiSession)        (cursor +        (temp file)   (StorageSink)
//!                                             projection)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use intercom_s3_connector::{
//!     ConnectorResult, EnvCredentialResolver, IntercomToS3Operator, OperatorConfig,
//! };
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> ConnectorResult<()> {
//!     let mut config = OperatorConfig::new(
//!         "intercom_default",
//!         "users",
//!         "s3_default",
//!         "analytics-raw",
//!         "intercom/users.json",
//!     );
//!     config.fields = Some(vec!["id".to_string(), "email".to_string()]);
//!     config.replication_key_name = Some("updated_at".to_string());
//!     config.replication_key_value = json!(1_700_000_000);
//!
//!     let mut operator = IntercomToS3Operator::new(config)?;
//!     let summary = operator.execute(&EnvCredentialResolver::default()).await?;
//!     println!("wrote {} records to s3://{}/{}", summary.written, summary.bucket, summary.key);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Incremental extraction**: integer replication cursor, records at or past the cursor are kept
//! - **Field projection**: keep only an allowlist of fields, in allowlist order
//! - **Lenient mode**: skip and count malformed records instead of aborting
//! - **Pluggable seams**: credential resolver, API session and storage sink are traits
//! - **Observability**: structured logging with `tracing`, counters and histograms with `metrics`

mod config;
mod credentials;
mod error;
mod filter;
mod intercom;
mod metrics;
mod operator;
mod record;
mod storage;
mod traits;
pub mod utils;
mod writer;

// Re-export public API
pub use config::{IntercomSettings, OperatorConfig, ProcessingSettings, SingleObjectPolicy};
pub use credentials::{Connection, EnvCredentialResolver, StaticCredentialResolver};
pub use error::{ConnectorError, ConnectorResult};
pub use filter::{
    coerce_integer, FieldProjection, FilteredRecordStream, RecordFilter, ReplicationCursor,
};
pub use intercom::{IntercomSession, Method, Resource};
pub use metrics::{ConnectorMetrics, RunTimer};
pub use operator::{IntercomToS3Operator, OperatorState, RunSummary};
pub use record::{IntercomObject, NormalizedRecord, ObjectKind, RawResult, ToMapping};
pub use storage::{S3ConnectionSettings, S3Sink};
pub use traits::{ApiSession, CredentialResolver, StorageSink};
pub use writer::{SinkWriter, UploadReport};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
