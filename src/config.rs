//! Configuration management for the operator.

use crate::{ConnectorError, ConnectorResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;

/// Invocation parameters for one operator run
///
/// # Structure
/// - **Mandatory fields**: `intercom_conn_id`, `intercom_obj`, `s3_conn_id`, `s3_bucket`,
///   and at least one of `output` / `s3_key`
/// - **Optional fields**: method, projection, replication cursor, extra query arguments
/// - **Settings** (config file or defaults): `processing`, `intercom`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Connection id holding the Intercom `personal_access_token`
    pub intercom_conn_id: String,

    /// Intercom resource to query (e.g. "users", "companies")
    pub intercom_obj: String,

    /// Method to call on the resource
    #[serde(default = "default_intercom_method")]
    pub intercom_method: String,

    /// Connection id holding the S3 parameters
    pub s3_conn_id: String,

    /// Destination bucket
    pub s3_bucket: String,

    /// Destination key, used when `output` is empty
    #[serde(default)]
    pub s3_key: String,

    /// Destination key and temp-file label
    #[serde(default)]
    pub output: String,

    /// Optional field allowlist; `None` or empty keeps every field
    #[serde(default)]
    pub fields: Option<Vec<String>>,

    /// Optional replication key name
    #[serde(default)]
    pub replication_key_name: Option<String>,

    /// Replication cursor value (integer or integer string)
    #[serde(default = "default_replication_key_value")]
    pub replication_key_value: Value,

    /// Extra arguments forwarded verbatim to the Intercom method
    #[serde(default)]
    pub query: Map<String, Value>,

    /// Filter and runtime settings
    #[serde(default)]
    pub processing: ProcessingSettings,

    /// Intercom HTTP settings
    #[serde(default)]
    pub intercom: IntercomSettings,
}

fn default_intercom_method() -> String {
    "all".to_string()
}
fn default_replication_key_value() -> Value {
    Value::from(0)
}

impl OperatorConfig {
    /// Create a config with the mandatory fields and defaults for the rest
    pub fn new(
        intercom_conn_id: impl Into<String>,
        intercom_obj: impl Into<String>,
        s3_conn_id: impl Into<String>,
        s3_bucket: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            intercom_conn_id: intercom_conn_id.into(),
            intercom_obj: intercom_obj.into(),
            intercom_method: default_intercom_method(),
            s3_conn_id: s3_conn_id.into(),
            s3_bucket: s3_bucket.into(),
            s3_key: String::new(),
            output: output.into(),
            fields: None,
            replication_key_name: None,
            replication_key_value: default_replication_key_value(),
            query: Map::new(),
            processing: ProcessingSettings::default(),
            intercom: IntercomSettings::default(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// Required:
    /// - `INTERCOM_CONN_ID`, `INTERCOM_OBJ`, `S3_CONN_ID`, `S3_BUCKET`
    /// - `OUTPUT` or `S3_KEY`
    ///
    /// Optional: `INTERCOM_METHOD`, `FIELDS` (comma separated),
    /// `REPLICATION_KEY_NAME`, `REPLICATION_KEY_VALUE`.
    ///
    /// Processing and Intercom settings use defaults.
    pub fn from_env() -> ConnectorResult<Self> {
        let required = |name: &str| {
            env::var(name).map_err(|_| ConnectorError::config(format!("{} is required", name)))
        };

        let mut config = Self::new(
            required("INTERCOM_CONN_ID")?,
            required("INTERCOM_OBJ")?,
            required("S3_CONN_ID")?,
            required("S3_BUCKET")?,
            env::var("OUTPUT").unwrap_or_default(),
        );
        config.s3_key = env::var("S3_KEY").unwrap_or_default();
        config.apply_env_overrides();

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> ConnectorResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConnectorError::config(format!("Failed to read config file {}: {}", path, e))
        })?;

        Self::from_toml_str(&content).map_err(|e| {
            ConnectorError::config(format!("Failed to parse config file {}: {}", path, e))
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> ConnectorResult<Self> {
        toml::from_str(content).map_err(|e| ConnectorError::config(e.to_string()))
    }

    /// Apply environment variable overrides to the invocation parameters
    ///
    /// Settings tables (`processing`, `intercom`) are only read from the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("INTERCOM_CONN_ID") {
            self.intercom_conn_id = val;
        }
        if let Ok(val) = env::var("INTERCOM_OBJ") {
            self.intercom_obj = val;
        }
        if let Ok(val) = env::var("INTERCOM_METHOD") {
            self.intercom_method = val;
        }
        if let Ok(val) = env::var("S3_CONN_ID") {
            self.s3_conn_id = val;
        }
        if let Ok(val) = env::var("S3_BUCKET") {
            self.s3_bucket = val;
        }
        if let Ok(val) = env::var("S3_KEY") {
            self.s3_key = val;
        }
        if let Ok(val) = env::var("OUTPUT") {
            self.output = val;
        }
        if let Ok(val) = env::var("FIELDS") {
            self.fields = Some(parse_field_list(&val));
        }
        if let Ok(val) = env::var("REPLICATION_KEY_NAME") {
            self.replication_key_name = Some(val).filter(|v| !v.is_empty());
        }
        if let Ok(val) = env::var("REPLICATION_KEY_VALUE") {
            self.replication_key_value = Value::String(val);
        }
    }

    /// Object key the NDJSON file is uploaded to
    pub fn destination_key(&self) -> &str {
        if self.output.is_empty() {
            &self.s3_key
        } else {
            &self.output
        }
    }

    /// Projection list, if one is active
    pub fn allowed_fields(&self) -> Option<&[String]> {
        self.fields.as_deref().filter(|f| !f.is_empty())
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConnectorResult<()> {
        if self.intercom_conn_id.is_empty() {
            return Err(ConnectorError::config("intercom_conn_id cannot be empty"));
        }

        if self.intercom_obj.is_empty() {
            return Err(ConnectorError::config("intercom_obj cannot be empty"));
        }

        if self.intercom_method.is_empty() {
            return Err(ConnectorError::config("intercom_method cannot be empty"));
        }

        if self.s3_conn_id.is_empty() {
            return Err(ConnectorError::config("s3_conn_id cannot be empty"));
        }

        if self.s3_bucket.is_empty() {
            return Err(ConnectorError::config("s3_bucket cannot be empty"));
        }

        if self.destination_key().is_empty() {
            return Err(ConnectorError::config(
                "either output or s3_key must name the destination object",
            ));
        }

        if let Some(fields) = &self.fields {
            if fields.iter().any(|f| f.is_empty()) {
                return Err(ConnectorError::config("fields cannot contain empty names"));
            }
        }

        if self.intercom.timeout_secs == 0 {
            return Err(ConnectorError::config("intercom.timeout_secs must be > 0"));
        }

        Ok(())
    }
}

fn parse_field_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect()
}

/// What to do with a result that is a single object rather than a collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingleObjectPolicy {
    /// Filter and project the object like any collection element
    #[default]
    Uniform,
    /// Emit the normalized object untouched (legacy behavior)
    Bypass,
}

/// Filter and runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingSettings {
    /// Skip and log malformed records instead of aborting the run
    #[serde(default)]
    pub lenient: bool,

    /// Handling of single-object results
    #[serde(default)]
    pub single_object: SingleObjectPolicy,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            lenient: false,
            single_object: SingleObjectPolicy::Uniform,
            log_level: "info".to_string(),
        }
    }
}

/// Intercom HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntercomSettings {
    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Page size requested from list endpoints
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_base_url() -> String {
    "https://api.intercom.io".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_per_page() -> u32 {
    50
}

impl Default for IntercomSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: 30,
            per_page: 50,
        }
    }
}
