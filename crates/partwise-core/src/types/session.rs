//! Multipart session types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque upload id issued by the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a store needs to address one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub bucket: String,
    pub key: String,
    pub token: SessionToken,
}

impl SessionHandle {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, token: SessionToken) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            token,
        }
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} [{}]", self.bucket, self.key, self.token)
    }
}

/// A resumable upload as seen by one transfer call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSession {
    pub handle: SessionHandle,
    /// Nominal part size, fixed for the session's lifetime
    pub part_size: u64,
    pub total_size: u64,
    /// True when the session existed before this call
    pub resumed: bool,
}

/// An open session found on the store, with what it already holds
#[derive(Debug, Clone, Serialize)]
pub struct PendingUpload {
    pub handle: SessionHandle,
    pub committed_parts: u32,
    pub committed_bytes: u64,
    /// Size of the largest committed part, i.e. the session's nominal part size
    /// whenever more than one part is committed
    pub part_size_hint: Option<u64>,
    pub checked_at: DateTime<Utc>,
}

/// Result of a finalized upload or single put
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectHandle {
    pub bucket: String,
    pub key: String,
    pub etag: Option<String>,
}

/// Object metadata as reported by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub size: u64,
    pub etag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_handle_display() {
        let handle = SessionHandle::new("test", "mysql.tar.gz", SessionToken::new("u-1"));
        assert_eq!(handle.to_string(), "test/mysql.tar.gz [u-1]");
        assert_eq!(handle.token.as_str(), "u-1");
    }

    #[test]
    fn test_token_serializes_transparently() {
        let json = serde_json::to_string(&SessionToken::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
