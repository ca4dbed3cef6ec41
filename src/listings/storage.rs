use async_trait::async_trait;

/// Object-storage abstraction for listing photos. Public URLs are built by
/// deterministic templating, never fetched.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Store the blob under `key`, returning the persisted path.
    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<String, PhotoStoreError>;
    /// Delete the given keys. A missing key is not an error.
    async fn remove(&self, keys: &[String]) -> Result<(), PhotoStoreError>;
    fn public_url(&self, key: &str) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum PhotoStoreError {
    #[error("object storage rejected the upload: {0}")]
    Rejected(String),
    #[error("object storage unavailable: {0}")]
    Transport(String),
}
