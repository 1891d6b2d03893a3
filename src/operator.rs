//! Operator entry point: one Intercom → S3 extraction per call.
//!
//! The operator walks a fixed state machine:
//!
//! ```text
//! Unauthenticated ──► Fetching ──► Writing ──► Succeeded
//!        │               │            │
//!        └───────────────┴────────────┴──────► Failed
//! ```
//!
//! Nothing is retried here; every error moves the operator to `Failed` and is
//! returned to the workflow engine, which owns retry and scheduling.

use crate::filter::{FilteredRecordStream, RecordFilter};
use crate::intercom::IntercomSession;
use crate::metrics::RunTimer;
use crate::storage::S3Sink;
use crate::writer::SinkWriter;
use crate::{
    ApiSession, ConnectorError, ConnectorMetrics, ConnectorResult, CredentialResolver,
    OperatorConfig, StorageSink,
};
use std::fmt;
use tracing::{error, info};

/// Where an operator is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorState {
    Unauthenticated,
    Fetching,
    Writing,
    Succeeded,
    Failed,
}

impl OperatorState {
    /// Check if the run is over
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperatorState::Succeeded | OperatorState::Failed)
    }
}

impl fmt::Display for OperatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperatorState::Unauthenticated => "unauthenticated",
            OperatorState::Fetching => "fetching",
            OperatorState::Writing => "writing",
            OperatorState::Succeeded => "succeeded",
            OperatorState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// What a successful run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Objects returned by the API
    pub fetched: usize,
    /// Records uploaded
    pub written: usize,
    /// Malformed records skipped in lenient mode
    pub skipped: usize,
    /// Uploaded file size in bytes
    pub bytes: u64,
    pub bucket: String,
    pub key: String,
    pub state: OperatorState,
}

/// Extracts one Intercom resource and writes it to S3 as NDJSON
///
/// Create with `IntercomToS3Operator::new()` and run with `.execute(&resolver).await`.
pub struct IntercomToS3Operator {
    config: OperatorConfig,
    filter: RecordFilter,
    writer: SinkWriter,
    metrics: ConnectorMetrics,
    state: OperatorState,
}

impl IntercomToS3Operator {
    /// Create an operator
    ///
    /// Validates the configuration and the replication cursor before any
    /// network call.
    pub fn new(config: OperatorConfig) -> ConnectorResult<Self> {
        config.validate()?;

        Self::init_tracing(&config);

        let filter = RecordFilter::from_config(&config)?;
        let writer = SinkWriter::new(config.destination_key());
        let metrics = ConnectorMetrics::new(config.destination_key(), &config.intercom_obj);

        info!("Operator configured");
        info!(
            "Source: intercom {}.{} (connection '{}')",
            config.intercom_obj, config.intercom_method, config.intercom_conn_id
        );
        info!(
            "Destination: s3://{}/{} (connection '{}')",
            config.s3_bucket,
            config.destination_key(),
            config.s3_conn_id
        );

        Ok(Self {
            config,
            filter,
            writer,
            metrics,
            state: OperatorState::Unauthenticated,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &OperatorConfig {
        &self.config
    }

    /// Get the current state
    pub fn state(&self) -> OperatorState {
        self.state
    }

    /// Run one extraction against Intercom and S3
    ///
    /// Credentials for both connections are resolved through `resolver`.
    pub async fn execute(
        &mut self,
        resolver: &dyn CredentialResolver,
    ) -> ConnectorResult<RunSummary> {
        let _timer = RunTimer::start(self.metrics.clone());
        self.transition(OperatorState::Unauthenticated);

        info!("Prepping to gather data from Intercom");
        // A failed login ends the run here.
        let session = IntercomSession::connect(
            resolver,
            &self.config.intercom_conn_id,
            &self.config.intercom,
        )
        .await
        .map_err(|e| self.fail(e))?;

        let (fetched, stream) = self.fetch(&session).await?;
        drop(session);

        self.transition(OperatorState::Writing);
        let mut sink = S3Sink::connect(resolver, &self.config.s3_conn_id)
            .await
            .map_err(|e| self.fail(e))?;

        self.write(fetched, stream, &mut sink).await
    }

    /// Run one extraction with an already established session and sink
    pub async fn execute_with<A, S>(&mut self, session: &A, sink: &mut S) -> ConnectorResult<RunSummary>
    where
        A: ApiSession + ?Sized,
        S: StorageSink + ?Sized,
    {
        let _timer = RunTimer::start(self.metrics.clone());

        let (fetched, stream) = self.fetch(session).await?;

        self.transition(OperatorState::Writing);
        self.write(fetched, stream, sink).await
    }

    /// Invoke the configured method and filter the result
    async fn fetch<A: ApiSession + ?Sized>(
        &mut self,
        session: &A,
    ) -> ConnectorResult<(usize, FilteredRecordStream)> {
        self.transition(OperatorState::Fetching);
        info!("Making request for {} object", self.config.intercom_obj);

        let raw = session
            .invoke(
                &self.config.intercom_obj,
                &self.config.intercom_method,
                &self.config.query,
            )
            .await
            .map_err(|e| self.fail(e))?;

        let fetched = raw.len();
        self.metrics.record_fetched(fetched);
        info!("Fetched {} {} object(s)", fetched, self.config.intercom_obj);

        let stream = self
            .filter
            .normalize_and_filter(raw)
            .map_err(|e| self.fail(e))?;
        self.metrics.record_skipped(stream.skipped());

        Ok((fetched, stream))
    }

    /// Write the stream to a temp file and upload it
    async fn write<S: StorageSink + ?Sized>(
        &mut self,
        fetched: usize,
        stream: FilteredRecordStream,
        sink: &mut S,
    ) -> ConnectorResult<RunSummary> {
        let report = self
            .writer
            .write_and_upload(
                &stream,
                self.config.destination_key(),
                &self.config.s3_bucket,
                sink,
            )
            .await
            .map_err(|e| self.fail(e))?;

        self.metrics.record_written(report.records);
        self.metrics.record_upload_bytes(report.bytes);
        self.metrics.set_health(true);
        self.transition(OperatorState::Succeeded);
        info!("Query finished!");

        Ok(RunSummary {
            fetched,
            written: report.records,
            skipped: stream.skipped(),
            bytes: report.bytes,
            bucket: report.bucket,
            key: report.key,
            state: self.state,
        })
    }

    fn transition(&mut self, next: OperatorState) {
        if self.state != next {
            info!("Operator state: {} -> {}", self.state, next);
        }
        self.state = next;
    }

    fn fail(&mut self, e: ConnectorError) -> ConnectorError {
        error!("Operator failed while {}: {}", self.state, e);
        self.metrics.record_failure(e.kind());
        self.state = OperatorState::Failed;
        e
    }

    /// Initialize tracing/logging
    fn init_tracing(config: &OperatorConfig) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.processing.log_level));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .ok(); // Ignore if already initialized
    }
}
