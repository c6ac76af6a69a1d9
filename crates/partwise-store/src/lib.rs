//! Partwise Store
//!
//! The object-store capability consumed by the transfer engine, with two
//! backends:
//!
//! - [`S3Store`]: any S3-compatible service through `aws-sdk-s3`
//! - [`MemoryStore`]: an in-process store with failure injection, used to
//!   exercise resumption without a network

mod memory;
mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use partwise_core::types::{
    ByteRange, CompletedPart, IntegrityTag, ObjectHandle, ObjectMetadata, PartPage,
    SessionHandle, SessionToken,
};
use partwise_core::Result;
use std::pin::Pin;
use tokio::io::AsyncRead;

pub use memory::MemoryStore;
pub use s3::S3Store;

/// Byte stream of an object's content
pub type ObjectStream = Pin<Box<dyn AsyncRead + Send>>;

/// Object store trait
///
/// Every call maps to one remote operation. Implementations never retry;
/// failures surface as `Error::Store` naming the operation.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Find a not-yet-finalized session for `bucket/key`
    async fn find_open_session(&self, bucket: &str, key: &str) -> Result<Option<SessionToken>>;

    /// Start a new session for `bucket/key`
    async fn open_session(&self, bucket: &str, key: &str) -> Result<SessionToken>;

    /// List committed parts with part numbers greater than `cursor`
    async fn list_committed_parts(
        &self,
        session: &SessionHandle,
        cursor: Option<u32>,
    ) -> Result<PartPage>;

    /// Upload one part; `range` is where `data` sits in the source
    async fn upload_part(
        &self,
        session: &SessionHandle,
        part_number: u32,
        range: ByteRange,
        data: Bytes,
    ) -> Result<IntegrityTag>;

    /// Finalize a session from its parts in ascending order
    async fn complete_session(
        &self,
        session: &SessionHandle,
        parts: &[CompletedPart],
    ) -> Result<ObjectHandle>;

    /// Discard a session and its parts
    async fn abort_session(&self, session: &SessionHandle) -> Result<()>;

    /// Store a whole object in one request
    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<ObjectHandle>;

    /// Get object size
    async fn object_metadata(&self, bucket: &str, key: &str) -> Result<ObjectMetadata>;

    /// Stream object content
    async fn open_object_stream(&self, bucket: &str, key: &str) -> Result<ObjectStream>;
}
