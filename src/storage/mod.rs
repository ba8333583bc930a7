//! Document blob storage
//!
//! Uploaded documents (id documents, bank statements, proof of income) go
//! to an external object store; only the resulting public URL is kept on
//! the loan record.

mod http;
mod memory;

pub use http::HttpDocumentStore;
pub use memory::MemoryDocumentStore;

use async_trait::async_trait;
use thiserror::Error;

/// Upload size cap per document: 5 MiB.
pub const MAX_DOCUMENT_BYTES: usize = 5 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("document upload failed: {0}")]
    Upload(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store a blob and return its public URL. Re-uploading the same path
    /// overwrites, which is what the document retry path needs.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}
