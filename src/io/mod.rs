mod http;
mod local;
mod metadata;

pub use http::{HttpTransport, HttpTransportOptions};
pub use local::FileTransport;
pub use metadata::{DEFAULT_CONTENT_TYPE, ResourceMetadata};

use anyhow::Result;
use async_trait::async_trait;

/// Network-side collaborator of a [`VirtualFile`](crate::VirtualFile).
///
/// Anything that can describe a resource and hand out byte ranges of it
/// can back a virtual file.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the resource metadata without its content.
    async fn probe(&self) -> Result<ResourceMetadata>;

    /// Fetch the bytes in `[offset, offset + length)`.
    async fn fetch_range(&self, offset: u64, length: u64) -> Result<Vec<u8>>;
}
