//! `intercom-to-s3`: run one Intercom → S3 extraction and exit.
//!
//! Configuration comes from the TOML file named by `OPERATOR_CONFIG` (with
//! environment overrides applied on top), or from environment variables alone:
//!
//! ```text
//! INTERCOM_CONN_ID=intercom_default INTERCOM_OBJ=users \
//! S3_CONN_ID=s3_default S3_BUCKET=analytics-raw OUTPUT=intercom/users.json \
//! CONNECTOR_CONN_INTERCOM_DEFAULT='{"personal_access_token": "..."}' \
//! CONNECTOR_CONN_S3_DEFAULT='{"region_name": "eu-west-1"}' \
//! intercom-to-s3
//! ```

use intercom_s3_connector::{
    ConnectorResult, EnvCredentialResolver, IntercomToS3Operator, OperatorConfig,
};

fn load_config() -> ConnectorResult<OperatorConfig> {
    match std::env::var("OPERATOR_CONFIG") {
        Ok(path) => {
            let mut config = OperatorConfig::from_file(&path)?;
            config.apply_env_overrides();
            Ok(config)
        }
        Err(_) => OperatorConfig::from_env(),
    }
}

#[tokio::main]
async fn main() -> ConnectorResult<()> {
    let config = load_config()?;

    let mut operator = IntercomToS3Operator::new(config)?;
    let summary = operator.execute(&EnvCredentialResolver::default()).await?;

    tracing::info!(
        "Run {}: {} fetched, {} written, {} skipped -> s3://{}/{}",
        summary.state,
        summary.fetched,
        summary.written,
        summary.skipped,
        summary.bucket,
        summary.key
    );

    Ok(())
}
