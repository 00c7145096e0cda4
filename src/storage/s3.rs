use super::{ObjectStore, StorageConfig, StoredObject};
use crate::error::AppError;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::sync::Arc;

/// S3-backed object store. Credentials and endpoint resolution follow the
/// standard AWS environment chain.
#[derive(Clone)]
pub struct S3Store {
    client: Arc<Client>,
    config: StorageConfig,
}

impl S3Store {
    pub async fn connect(config: StorageConfig) -> Self {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: Arc::new(Client::new(&aws_config)),
            config,
        }
    }

    pub fn with_client(client: Client, config: StorageConfig) -> Self {
        Self {
            client: Arc::new(client),
            config,
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, AppError> {
        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("put {key}: {e}")))?;

        Ok(StoredObject {
            key: key.to_string(),
            url: self.config.object_url(key),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("delete {key}: {e}")))?;

        Ok(())
    }
}
