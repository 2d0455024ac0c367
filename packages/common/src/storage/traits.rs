use async_trait::async_trait;

use super::error::StorageError;

/// Outcome of a successful [`ImageStore::put`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Generated filename, unique per distinct content.
    pub filename: String,
    /// Size in bytes.
    pub size: u64,
    /// `false` when identical content was already stored under the same name.
    pub created: bool,
}

/// Durable storage for generated images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store image bytes under a generated filename with the given extension.
    ///
    /// The write is atomic: readers either see the whole file or nothing.
    async fn put(&self, data: &[u8], extension: &str) -> Result<StoredImage, StorageError>;

    /// Read a stored image.
    async fn get(&self, filename: &str) -> Result<Vec<u8>, StorageError>;

    /// Delete a stored image.
    ///
    /// Returns `true` if the image was deleted, `false` if it did not exist.
    async fn delete(&self, filename: &str) -> Result<bool, StorageError>;
}
