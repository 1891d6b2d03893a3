//! S3Sink - uploads the finished NDJSON file with `PutObject`

use crate::{Connection, ConnectorError, ConnectorResult, CredentialResolver, StorageSink};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use tracing::{debug, info};

/// S3 parameters read from a connection's extras
///
/// Keys: `aws_access_key_id`, `aws_secret_access_key`, `aws_session_token`,
/// `region_name`, `endpoint_url`, `force_path_style`. Without an access key the
/// default AWS credential chain is used.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct S3ConnectionSettings {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

impl S3ConnectionSettings {
    /// Read settings from a resolved connection
    pub fn from_connection(connection: &Connection) -> ConnectorResult<Self> {
        let settings = Self {
            access_key_id: connection.extra_str("aws_access_key_id").map(String::from),
            secret_access_key: connection
                .extra_str("aws_secret_access_key")
                .map(String::from),
            session_token: connection.extra_str("aws_session_token").map(String::from),
            region: connection.extra_str("region_name").map(String::from),
            endpoint_url: connection.extra_str("endpoint_url").map(String::from),
            force_path_style: connection.extra_bool("force_path_style").unwrap_or(false),
        };

        if settings.access_key_id.is_some() != settings.secret_access_key.is_some() {
            return Err(ConnectorError::authentication(format!(
                "connection '{}' must set both aws_access_key_id and aws_secret_access_key",
                connection.conn_id
            )));
        }

        Ok(settings)
    }

    fn static_credentials(&self) -> Option<Credentials> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(key), Some(secret)) => Some(Credentials::new(
                key.clone(),
                secret.clone(),
                self.session_token.clone(),
                None,
                "connection-extras",
            )),
            _ => None,
        }
    }
}

// Keys are secrets; only presence is printed.
impl std::fmt::Debug for S3ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ConnectionSettings")
            .field("static_credentials", &self.access_key_id.is_some())
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

/// Storage sink backed by S3 (or any S3-compatible endpoint)
pub struct S3Sink {
    client: Option<Client>,
}

impl S3Sink {
    /// Resolve `conn_id` and build a client from its extras
    pub async fn connect(resolver: &dyn CredentialResolver, conn_id: &str) -> ConnectorResult<Self> {
        let connection = resolver.resolve(conn_id).await?;
        let settings = S3ConnectionSettings::from_connection(&connection)?;
        debug!("S3 connection '{}': {:?}", conn_id, settings);
        Ok(Self::from_settings(&settings).await)
    }

    /// Build a client from explicit settings
    pub async fn from_settings(settings: &S3ConnectionSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(credentials) = settings.static_credentials() {
            loader = loader.credentials_provider(credentials);
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &settings.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }
        builder = builder.force_path_style(settings.force_path_style);

        Self::from_client(Client::from_conf(builder.build()))
    }

    /// Wrap an existing client
    pub fn from_client(client: Client) -> Self {
        Self {
            client: Some(client),
        }
    }

    fn client(&self) -> ConnectorResult<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| ConnectorError::upload("S3 connection already closed"))
    }

    async fn object_exists(&self, client: &Client, bucket: &str, key: &str) -> ConnectorResult<bool> {
        match client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().map(|se| se.is_not_found()).unwrap_or(false) => Ok(false),
            Err(e) => Err(ConnectorError::upload_with_source(
                format!("Failed to check s3://{}/{}", bucket, key),
                e,
            )),
        }
    }
}

#[async_trait]
impl StorageSink for S3Sink {
    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        bucket: &str,
        replace: bool,
    ) -> ConnectorResult<()> {
        let client = self.client()?;

        if !replace && self.object_exists(client, bucket, key).await? {
            return Err(ConnectorError::upload(format!(
                "s3://{}/{} already exists and replace is disabled",
                bucket, key
            )));
        }

        let body = ByteStream::from_path(local_path).await.map_err(|e| {
            ConnectorError::upload_with_source(
                format!("Failed to read {}", local_path.display()),
                e,
            )
        })?;

        client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type("application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                ConnectorError::upload_with_source(format!("PutObject s3://{}/{} failed", bucket, key), e)
            })?;

        info!("PutObject s3://{}/{} completed", bucket, key);
        Ok(())
    }

    async fn close(&mut self) -> ConnectorResult<()> {
        if self.client.take().is_some() {
            debug!("S3 client released");
        }
        Ok(())
    }
}
