//! S3 client construction and `s3://` URI parsing

use crate::config::Config;
use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::Client;
use std::fmt;
use tracing::debug;

/// Create an S3 client from a profile.
///
/// Explicit profile settings are used when present; anything missing comes
/// from the standard AWS provider chain.
pub async fn create_client(config: &Config) -> Result<Client> {
    let shared = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .load()
        .await;

    let mut builder = S3ConfigBuilder::from(&shared).force_path_style(config.path_style);

    if let Some(endpoint) = &config.endpoint {
        builder = builder.endpoint_url(endpoint);
    }

    match (&config.access_key, &config.secret_key) {
        (Some(access_key), Some(secret_key)) => {
            let credentials = Credentials::new(access_key, secret_key, None, None, "partwise-cli");
            builder = builder.credentials_provider(credentials);
        }
        (None, None) => debug!("Using credentials from the AWS provider chain"),
        _ => anyhow::bail!(
            "Both access_key and secret_key must be set. Use 'partwise configure set'"
        ),
    }

    Ok(Client::from_conf(builder.build()))
}

/// An `s3://bucket/key` location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Uri {
    pub bucket: String,
    pub key: String,
}

impl S3Uri {
    /// Parse an object URI. Both bucket and key are required.
    pub fn parse(uri: &str) -> Result<Self> {
        let path = uri
            .strip_prefix("s3://")
            .with_context(|| format!("Invalid S3 URI: {}. Must start with s3://", uri))?;

        let (bucket, key) = path
            .split_once('/')
            .with_context(|| format!("Invalid S3 URI: {}. Object key required", uri))?;

        if bucket.is_empty() {
            anyhow::bail!("Invalid S3 URI: bucket name cannot be empty");
        }
        if key.is_empty() {
            anyhow::bail!("Invalid S3 URI: {}. Object key required", uri);
        }
        if key.ends_with('/') {
            anyhow::bail!("Invalid S3 URI: {}. Key must name an object, not a prefix", uri);
        }

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    /// Key with the file name of `path` appended, for `s3://bucket/` style targets
    pub fn parse_for_upload(uri: &str, path: &std::path::Path) -> Result<Self> {
        if uri.ends_with('/') {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("Cannot derive an object key from {:?}", path))?;
            return Self::parse(&format!("{}{}", uri, name));
        }
        Self::parse(uri)
    }
}

impl fmt::Display for S3Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}
