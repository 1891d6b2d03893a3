//! Error types for connector operations.

use thiserror::Error;

/// Result type for connector operations
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Error types for connector operations
///
/// Every variant is fatal for the invocation unless stated otherwise. Retry and
/// backoff belong to the workflow engine that runs the operator.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Credential resolution or session establishment failed
    ///
    /// Examples: unknown connection id, missing `personal_access_token`,
    /// HTTP 401/403 from the Intercom API
    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Requested resource or method does not exist on the API session
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// A replication cursor value could not be read as an integer
    ///
    /// Per-record error: skipped in lenient mode, fatal otherwise.
    #[error("Type coercion error on field '{field}': {message}")]
    TypeCoercion { field: String, message: String },

    /// A projected field is absent from a record
    ///
    /// Per-record error: skipped in lenient mode, fatal otherwise.
    #[error("Missing field: '{field}'")]
    MissingField { field: String },

    /// The storage sink rejected or failed the upload
    #[error("Upload error: {message}")]
    Upload {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Non-authentication failure talking to the Intercom API
    #[error("Fetch error: {message}")]
    Fetch {
        message: String,
        status: Option<u16>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error - detected before any network call
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConnectorError {
    /// Check if this error is a per-record error that lenient mode may skip
    ///
    /// Every error, this kind included, aborts the run outside lenient mode.
    pub fn is_record_error(&self) -> bool {
        matches!(
            self,
            ConnectorError::TypeCoercion { .. } | ConnectorError::MissingField { .. }
        )
    }

    /// Check if this error came from credentials or session setup
    pub fn is_authentication(&self) -> bool {
        matches!(self, ConnectorError::Authentication { .. })
    }

    /// Check if this error came from the storage sink
    pub fn is_upload(&self) -> bool {
        matches!(self, ConnectorError::Upload { .. })
    }

    /// Short variant name, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            ConnectorError::Authentication { .. } => "authentication",
            ConnectorError::Lookup(_) => "lookup",
            ConnectorError::TypeCoercion { .. } => "type_coercion",
            ConnectorError::MissingField { .. } => "missing_field",
            ConnectorError::Upload { .. } => "upload",
            ConnectorError::Fetch { .. } => "fetch",
            ConnectorError::Configuration(_) => "configuration",
            ConnectorError::Serialization(_) => "serialization",
            ConnectorError::Io(_) => "io",
        }
    }

    /// Create an authentication error from a message
    pub fn authentication(message: impl Into<String>) -> Self {
        ConnectorError::Authentication {
            message: message.into(),
            source: None,
        }
    }

    /// Create an authentication error with source
    pub fn authentication_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::Authentication {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a lookup error
    pub fn lookup(message: impl Into<String>) -> Self {
        ConnectorError::Lookup(message.into())
    }

    /// Create a type coercion error for a field
    pub fn type_coercion(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConnectorError::TypeCoercion {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        ConnectorError::MissingField {
            field: field.into(),
        }
    }

    /// Create an upload error from a message
    pub fn upload(message: impl Into<String>) -> Self {
        ConnectorError::Upload {
            message: message.into(),
            source: None,
        }
    }

    /// Create an upload error with source
    pub fn upload_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::Upload {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a fetch error carrying the HTTP status
    pub fn fetch(message: impl Into<String>, status: Option<u16>) -> Self {
        ConnectorError::Fetch {
            message: message.into(),
            status,
            source: None,
        }
    }

    /// Create a fetch error with source
    pub fn fetch_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::Fetch {
            message: message.into(),
            status: None,
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        ConnectorError::Configuration(message.into())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for ConnectorError {
    fn from(err: serde_json::Error) -> Self {
        ConnectorError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let coercion = ConnectorError::type_coercion("updated_at", "not an integer");
        assert!(coercion.is_record_error());

        let missing = ConnectorError::missing_field("email");
        assert!(missing.is_record_error());

        let auth = ConnectorError::authentication("token missing");
        assert!(auth.is_authentication());
        assert!(!auth.is_record_error());

        let upload = ConnectorError::upload("bucket not found");
        assert!(upload.is_upload());
        assert!(!upload.is_record_error());
    }

    #[test]
    fn test_error_display() {
        let err = ConnectorError::missing_field("email");
        assert_eq!(err.to_string(), "Missing field: 'email'");

        let err = ConnectorError::type_coercion("updated_at", "expected integer, got null");
        assert_eq!(
            err.to_string(),
            "Type coercion error on field 'updated_at': expected integer, got null"
        );

        let err = ConnectorError::lookup("unknown resource 'widgets'");
        assert_eq!(err.to_string(), "Lookup error: unknown resource 'widgets'");
    }

    #[test]
    fn test_error_source_is_kept() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let err = ConnectorError::upload_with_source("put object failed", io);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_from_serde_json_error() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: ConnectorError = parse.unwrap_err().into();
        assert!(matches!(err, ConnectorError::Serialization(_)));
    }
}
