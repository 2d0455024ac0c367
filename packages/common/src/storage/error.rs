use thiserror::Error;

/// Errors that can occur during image storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested image was not found.
    #[error("image not found: {0}")]
    NotFound(String),

    /// An I/O error occurred.
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The filename is not one this store could have produced.
    #[error("invalid image filename: {0}")]
    InvalidFilename(String),

    /// The image exceeds the configured size limit.
    #[error("image exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
}
