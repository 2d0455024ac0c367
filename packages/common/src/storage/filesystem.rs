use std::path::PathBuf;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;

use super::error::StorageError;
use super::traits::{ImageStore, StoredImage};

const FILENAME_PREFIX: &str = "img_";

/// Filesystem-backed content-addressed image store.
///
/// Images live flat in `{base_path}/img_{sha256 hex}.{ext}`, so identical
/// bytes always map to the same file.
pub struct FilesystemImageStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemImageStore {
    /// Create a new filesystem image store, creating its directories if needed.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    /// Directory the images are written to.
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    /// Build the filename for the given content.
    pub fn filename_for(data: &[u8], extension: &str) -> String {
        let digest = Sha256::digest(data);
        format!(
            "{FILENAME_PREFIX}{}.{}",
            hex::encode(digest),
            extension.to_ascii_lowercase()
        )
    }

    fn image_path(&self, filename: &str) -> Result<PathBuf, StorageError> {
        validate_filename(filename)?;
        Ok(self.base_path.join(filename))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

/// Accept only names of the form `img_<64 hex>.<alnum ext>`.
fn validate_filename(filename: &str) -> Result<(), StorageError> {
    let invalid = || StorageError::InvalidFilename(filename.to_string());

    let rest = filename.strip_prefix(FILENAME_PREFIX).ok_or_else(invalid)?;
    let (hash, ext) = rest.split_once('.').ok_or_else(invalid)?;

    let hash_ok = hash.len() == 64 && hash.chars().all(|c| c.is_ascii_hexdigit());
    let ext_ok = !ext.is_empty()
        && ext.len() <= 8
        && ext.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());

    if hash_ok && ext_ok { Ok(()) } else { Err(invalid()) }
}

#[async_trait]
impl ImageStore for FilesystemImageStore {
    async fn put(&self, data: &[u8], extension: &str) -> Result<StoredImage, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let filename = Self::filename_for(data, extension);
        let image_path = self.image_path(&filename)?;

        if fs::try_exists(&image_path).await? {
            return Ok(StoredImage {
                filename,
                size: data.len() as u64,
                created: false,
            });
        }

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, &image_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(StoredImage {
            filename,
            size: data.len() as u64,
            created: true,
        })
    }

    async fn get(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        let image_path = self.image_path(filename)?;
        match fs::read(&image_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, filename: &str) -> Result<bool, StorageError> {
        let image_path = self.image_path(filename)?;
        match fs::remove_file(&image_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
