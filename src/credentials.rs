//! Connection lookup: resolvers that turn a connection id into secrets.

use crate::{ConnectorError, ConnectorResult, CredentialResolver};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::env;
use std::fmt;

/// A resolved connection: its id and the extra parameters stored with it
#[derive(Clone)]
pub struct Connection {
    pub conn_id: String,
    pub extra: Map<String, Value>,
}

impl Connection {
    /// Create a connection from its extras
    pub fn new(conn_id: impl Into<String>, extra: Map<String, Value>) -> Self {
        Self {
            conn_id: conn_id.into(),
            extra,
        }
    }

    /// Get a string extra; empty strings count as absent
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Get a boolean extra, accepting `true`/`false` and their string forms
    pub fn extra_bool(&self, key: &str) -> Option<bool> {
        match self.extra.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Intercom token stored under `personal_access_token`
    pub fn personal_access_token(&self) -> ConnectorResult<&str> {
        self.extra_str("personal_access_token").ok_or_else(|| {
            ConnectorError::authentication(format!(
                "connection '{}' has no personal_access_token",
                self.conn_id
            ))
        })
    }
}

// Extras hold secrets; only the keys are printed.
impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("conn_id", &self.conn_id)
            .field("extra_keys", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Reads connections from environment variables
///
/// Connection `intercom_default` is read from `CONNECTOR_CONN_INTERCOM_DEFAULT`,
/// whose value is a JSON object of extras:
///
/// ```text
/// CONNECTOR_CONN_INTERCOM_DEFAULT='{"personal_access_token": "dG9rOm..."}'
/// CONNECTOR_CONN_S3_DEFAULT='{"region_name": "eu-west-1"}'
/// ```
#[derive(Debug, Clone)]
pub struct EnvCredentialResolver {
    prefix: String,
}

impl EnvCredentialResolver {
    /// Create a resolver with a custom variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Name of the variable holding `conn_id`
    pub fn variable_name(&self, conn_id: &str) -> String {
        let suffix: String = conn_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}{}", self.prefix, suffix)
    }
}

impl Default for EnvCredentialResolver {
    fn default() -> Self {
        Self::with_prefix("CONNECTOR_CONN_")
    }
}

#[async_trait]
impl CredentialResolver for EnvCredentialResolver {
    async fn resolve(&self, conn_id: &str) -> ConnectorResult<Connection> {
        let name = self.variable_name(conn_id);
        let raw = env::var(&name).map_err(|_| {
            ConnectorError::authentication(format!(
                "connection '{}' not found ({} is not set)",
                conn_id, name
            ))
        })?;

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(extra)) => Ok(Connection::new(conn_id, extra)),
            Ok(_) => Err(ConnectorError::authentication(format!(
                "{} must hold a JSON object",
                name
            ))),
            Err(e) => Err(ConnectorError::authentication_with_source(
                format!("{} is not valid JSON", name),
                e,
            )),
        }
    }
}

/// In-memory connections, for programmatic setups and tests
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialResolver {
    connections: HashMap<String, Connection>,
}

impl StaticCredentialResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection
    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections
            .insert(connection.conn_id.clone(), connection);
        self
    }
}

#[async_trait]
impl CredentialResolver for StaticCredentialResolver {
    async fn resolve(&self, conn_id: &str) -> ConnectorResult<Connection> {
        self.connections
            .get(conn_id)
            .cloned()
            .ok_or_else(|| {
                ConnectorError::authentication(format!("connection '{}' not found", conn_id))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extras(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_personal_access_token() {
        let conn = Connection::new("intercom", extras(json!({"personal_access_token": "tok"})));
        assert_eq!(conn.personal_access_token().unwrap(), "tok");

        let empty = Connection::new("intercom", extras(json!({"personal_access_token": ""})));
        assert!(empty.personal_access_token().unwrap_err().is_authentication());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let conn = Connection::new("intercom", extras(json!({"personal_access_token": "secret"})));
        let printed = format!("{:?}", conn);
        assert!(printed.contains("personal_access_token"));
        assert!(!printed.contains("secret\""));
    }

    #[test]
    fn test_extra_bool() {
        let conn = Connection::new(
            "s3",
            extras(json!({"force_path_style": "true", "other": false, "n": 1})),
        );
        assert_eq!(conn.extra_bool("force_path_style"), Some(true));
        assert_eq!(conn.extra_bool("other"), Some(false));
        assert_eq!(conn.extra_bool("n"), None);
    }

    #[test]
    fn test_variable_name() {
        let resolver = EnvCredentialResolver::default();
        assert_eq!(
            resolver.variable_name("intercom-default"),
            "CONNECTOR_CONN_INTERCOM_DEFAULT"
        );
    }

    #[tokio::test]
    async fn test_env_resolver() {
        let resolver = EnvCredentialResolver::with_prefix("ICS3_TEST_CONN_");
        env::set_var(
            "ICS3_TEST_CONN_INTERCOM",
            r#"{"personal_access_token": "abc"}"#,
        );
        env::set_var("ICS3_TEST_CONN_BROKEN", "not json");

        let conn = resolver.resolve("intercom").await.unwrap();
        assert_eq!(conn.personal_access_token().unwrap(), "abc");

        assert!(resolver.resolve("broken").await.unwrap_err().is_authentication());
        assert!(resolver.resolve("missing").await.unwrap_err().is_authentication());
    }

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver = StaticCredentialResolver::new()
            .with_connection(Connection::new("s3", Map::new()));

        assert_eq!(resolver.resolve("s3").await.unwrap().conn_id, "s3");
        assert!(resolver.resolve("nope").await.is_err());
    }
}
