//! Trait seams for the operator's external collaborators.
//!
//! - `CredentialResolver`: connection id → token and metadata
//! - `ApiSession`: invoke a method on an Intercom resource
//! - `StorageSink`: upload a local file to object storage

use crate::{Connection, ConnectorResult, IntercomObject, RawResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::Path;

/// Resolves a logical connection id into its stored secrets
///
/// # Example
///
/// ```rust,no_run
/// use intercom_s3_connector::{Connection, ConnectorError, ConnectorResult, CredentialResolver};
/// use async_trait::async_trait;
///
/// struct VaultResolver;
///
/// #[async_trait]
/// impl CredentialResolver for VaultResolver {
///     async fn resolve(&self, conn_id: &str) -> ConnectorResult<Connection> {
///         Err(ConnectorError::authentication(format!("no secret for {}", conn_id)))
///     }
/// }
/// ```
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Look up a connection
    ///
    /// # Errors
    ///
    /// Return `ConnectorError::Authentication` when the connection is unknown or unreadable
    async fn resolve(&self, conn_id: &str) -> ConnectorResult<Connection>;
}

/// A live session against the Intercom API
///
/// One session is built per invocation and dropped when the run ends.
#[async_trait]
pub trait ApiSession: Send + Sync {
    /// Invoke `method` on `resource` with extra arguments
    ///
    /// # Return Value
    ///
    /// - `RawResult::Collection` for list-style methods (`all`, `find_all`, `scroll`)
    /// - `RawResult::Single` for `find`
    ///
    /// # Errors
    ///
    /// - `ConnectorError::Lookup` for unknown resources or methods
    /// - `ConnectorError::Authentication` when the API rejects the token
    /// - `ConnectorError::Fetch` for other API or transport failures
    async fn invoke(
        &self,
        resource: &str,
        method: &str,
        args: &Map<String, Value>,
    ) -> ConnectorResult<RawResult<IntercomObject>>;
}

/// Destination for the finished NDJSON file
#[async_trait]
pub trait StorageSink: Send + Sync {
    /// Upload `local_path` to `bucket`/`key`
    ///
    /// With `replace = true` an existing object is overwritten. With
    /// `replace = false` an existing object is an error.
    ///
    /// # Errors
    ///
    /// Return `ConnectorError::Upload` for any transport or authorization problem
    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        bucket: &str,
        replace: bool,
    ) -> ConnectorResult<()>;

    /// Optional: release any connection held by the sink
    ///
    /// Called once after the upload attempt, whatever its outcome.
    async fn close(&mut self) -> ConnectorResult<()> {
        Ok(())
    }
}
