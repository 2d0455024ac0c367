mod error;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use filesystem::FilesystemImageStore;
pub use traits::{ImageStore, StoredImage};
