//! Attachment Store Adapter: the object-store capability the messaging core
//! consumes. Bytes only reach an implementation after validation has passed.

pub mod s3;

use crate::error::AppError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Opaque id usable with [`ObjectStore::delete`].
    pub key: String,
    /// Stable retrieval URL.
    pub url: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

/// Where and how uploaded objects are addressed.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    /// Public base URL (CDN domain or the S3 endpoint).
    pub base_url: String,
    /// Path-style addressing instead of virtual-hosted-style.
    pub path_style: bool,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self {
            bucket: std::env::var("S3_BUCKET").unwrap_or_else(|_| "chat-attachments".to_string()),
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            base_url: std::env::var("S3_BASE_URL")
                .unwrap_or_else(|_| "https://s3.amazonaws.com".to_string()),
            path_style: std::env::var("S3_PATH_STYLE")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        }
    }

    pub fn object_url(&self, key: &str) -> String {
        if self.path_style {
            format!("{}/{}/{}", self.base_url, self.bucket, key)
        } else {
            format!("https://{}.s3.amazonaws.com/{}", self.bucket, key)
        }
    }

    #[cfg(test)]
    pub fn test_defaults() -> Self {
        Self {
            bucket: "chat-attachments-test".into(),
            region: "us-east-1".into(),
            base_url: "https://cdn.test".into(),
            path_style: true,
        }
    }
}

/// Upload key: namespaced per owner, collision-free, original name kept
/// readable at the tail.
pub fn object_key(owner_id: Uuid, file_name: &str) -> String {
    let safe_name: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachments/{}/{}/{}", owner_id, Uuid::new_v4(), safe_name)
}

/// In-memory store used by tests and local development.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
    base_url: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            base_url: "memory://attachments".to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().map(|m| m.contains_key(key)).unwrap_or(false)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, AppError> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| AppError::Storage("memory store poisoned".into()))?;
        objects.insert(key.to_string(), (content_type.to_string(), bytes));
        Ok(StoredObject {
            key: key.to_string(),
            url: format!("{}/{}", self.base_url, key),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| AppError::Storage("memory store poisoned".into()))?;
        objects.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_keys_are_namespaced_and_sanitized() {
        let owner = Uuid::new_v4();
        let key = object_key(owner, "my report (final).pdf");
        assert!(key.starts_with(&format!("attachments/{owner}/")));
        assert!(key.ends_with("my_report__final_.pdf"));
    }

    #[test]
    fn path_style_urls_include_bucket() {
        let config = StorageConfig::test_defaults();
        assert_eq!(
            config.object_url("attachments/a/b/c.png"),
            "https://cdn.test/chat-attachments-test/attachments/a/b/c.png"
        );
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        let stored = store
            .put("attachments/x/y/z.txt", b"hello".to_vec(), "text/plain")
            .await
            .unwrap();
        assert!(store.contains(&stored.key));
        store.delete(&stored.key).await.unwrap();
        assert!(store.is_empty());
    }
}
