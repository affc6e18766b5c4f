//! Delivery bucket client.

use std::path::Path;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Configuration for the delivery bucket.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// S3 API endpoint URL
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// Region ("auto" for R2-style providers)
    pub region: String,
    /// Public base URL for shareable links
    pub public_base_url: String,
}

impl DeliveryConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("DELIVERY_ENDPOINT_URL")
                .map_err(|_| StorageError::config_error("DELIVERY_ENDPOINT_URL not set"))?,
            access_key_id: std::env::var("DELIVERY_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("DELIVERY_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("DELIVERY_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("DELIVERY_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("DELIVERY_BUCKET_NAME")
                .map_err(|_| StorageError::config_error("DELIVERY_BUCKET_NAME not set"))?,
            region: std::env::var("DELIVERY_REGION").unwrap_or_else(|_| "auto".to_string()),
            public_base_url: std::env::var("DELIVERY_PUBLIC_BASE_URL")
                .map_err(|_| StorageError::config_error("DELIVERY_PUBLIC_BASE_URL not set"))?,
        })
    }

    /// Like [`from_env`](Self::from_env), but absence of the endpoint
    /// variable means delivery is simply not configured. A partially
    /// set configuration is still an error.
    pub fn from_env_opt() -> StorageResult<Option<Self>> {
        if std::env::var("DELIVERY_ENDPOINT_URL").is_err() {
            return Ok(None);
        }
        Self::from_env().map(Some)
    }
}

/// Client for the studio's delivery bucket.
#[derive(Clone)]
pub struct DeliveryClient {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl DeliveryClient {
    /// Create a new client from configuration.
    pub fn new(config: DeliveryConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "delivery",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            public_base_url: config.public_base_url,
        }
    }

    /// Create from environment variables, `None` when delivery is not
    /// configured.
    pub fn from_env_opt() -> StorageResult<Option<Self>> {
        Ok(DeliveryConfig::from_env_opt()?.map(Self::new))
    }

    /// Upload a rendered video and return its shareable link.
    pub async fn upload_video(&self, path: impl AsRef<Path>, key: &str) -> StorageResult<String> {
        let path = path.as_ref();
        debug!("Uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type("video/mp4")
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        let link = self.shareable_link(key);
        info!("Uploaded {} to {}", path.display(), link);
        Ok(link)
    }

    /// Public link for an uploaded key.
    pub fn shareable_link(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), key)
    }

    /// Check if an object exists.
    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.to_string().contains("NotFound") || e.to_string().contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(StorageError::AwsSdk(e.to_string()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shareable_link_strips_trailing_slash() {
        let client = DeliveryClient::new(DeliveryConfig {
            endpoint_url: "https://s3.example.com".into(),
            access_key_id: "key".into(),
            secret_access_key: "secret".into(),
            bucket_name: "tours".into(),
            region: "auto".into(),
            public_base_url: "https://videos.example.com/".into(),
        });
        assert_eq!(
            client.shareable_link("renders/Ada_20260830_1015.mp4"),
            "https://videos.example.com/renders/Ada_20260830_1015.mp4"
        );
    }
}
