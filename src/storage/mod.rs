//! Media file storage backends.

pub mod filesystem;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Storage backend for uploaded media files.
///
/// Keys are paths relative to the media root, e.g. `images/photo-123.jpg`
/// or `thumbnails/thumb-photo-123.jpg`.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store content under the given relative path
    async fn put(&self, key: &str, content: Bytes) -> Result<()>;

    /// Retrieve content by relative path
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Check if a file exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Delete a file. A missing file is a tolerated no-op: deletion of a
    /// record whose backing file is already gone must still succeed.
    async fn delete(&self, key: &str) -> Result<()>;
}
