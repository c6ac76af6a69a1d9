//! In-process object store
//!
//! Follows S3 multipart semantics closely enough to exercise resumption:
//! part listings are paged, completion checks ordering, tags and the minimum
//! part size, and parts survive failed attempts until the session is
//! completed or aborted.

use crate::{ObjectStore, ObjectStream};
use async_trait::async_trait;
use bytes::Bytes;
use md5::{Digest, Md5};
use parking_lot::Mutex;
use partwise_core::types::{
    ByteRange, CommittedPart, CompletedPart, IntegrityTag, ObjectHandle, ObjectMetadata,
    PartPage, SessionHandle, SessionToken,
};
use partwise_core::{Error, Result, StoreOp};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Cursor;
use tracing::debug;
use uuid::Uuid;

/// Default number of parts per listing page, as on S3
const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    etag: String,
}

#[derive(Debug)]
struct Session {
    bucket: String,
    key: String,
    seq: u64,
    parts: BTreeMap<u32, StoredPart>,
}

#[derive(Debug, Clone)]
struct StoredPart {
    data: Bytes,
    tag: IntegrityTag,
}

#[derive(Debug, Default)]
struct State {
    objects: HashMap<(String, String), StoredObject>,
    sessions: HashMap<String, Session>,
    next_seq: u64,
    failing_parts: HashSet<u32>,
    upload_log: Vec<u32>,
    list_calls: usize,
    stream_limit: Option<usize>,
}

/// In-memory [`ObjectStore`]
pub struct MemoryStore {
    state: Mutex<State>,
    page_size: usize,
    min_part_size: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: DEFAULT_PAGE_SIZE,
            min_part_size: 0,
        }
    }

    /// Return at most `size` parts per listing page
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Reject completion when a non-final part is smaller than `size`
    pub fn with_min_part_size(mut self, size: u64) -> Self {
        self.min_part_size = size;
        self
    }

    /// Make every upload of `part_number` fail until [`heal`](Self::heal) is called
    pub fn fail_part(&self, part_number: u32) {
        self.state.lock().failing_parts.insert(part_number);
    }

    /// Clear all injected failures
    pub fn heal(&self) {
        self.state.lock().failing_parts.clear();
    }

    /// Cut every object stream short after `bytes` bytes
    pub fn truncate_streams(&self, bytes: usize) {
        self.state.lock().stream_limit = Some(bytes);
    }

    /// Part numbers of every successful `upload_part` call, in call order
    pub fn upload_log(&self) -> Vec<u32> {
        self.state.lock().upload_log.clone()
    }

    /// Number of `list_committed_parts` calls served
    pub fn list_calls(&self) -> usize {
        self.state.lock().list_calls
    }

    /// Content of a finalized object
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.state
            .lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.data.clone())
    }

    /// Store an object directly, bypassing sessions
    pub fn insert_object(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        let data = data.into();
        let etag = quoted_md5(&data);
        self.state
            .lock()
            .objects
            .insert((bucket.to_string(), key.to_string()), StoredObject { data, etag });
    }

    /// Number of open sessions for `bucket/key`
    pub fn open_sessions(&self, bucket: &str, key: &str) -> usize {
        self.state
            .lock()
            .sessions
            .values()
            .filter(|s| s.bucket == bucket && s.key == key)
            .count()
    }

    fn session_mismatch(op: StoreOp, session: &SessionHandle) -> Error {
        Error::store(op, format!("NoSuchUpload: {}", session))
    }
}

fn quoted_md5(data: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Md5::digest(data)))
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn find_open_session(&self, bucket: &str, key: &str) -> Result<Option<SessionToken>> {
        let state = self.state.lock();
        let newest = state
            .sessions
            .iter()
            .filter(|(_, s)| s.bucket == bucket && s.key == key)
            .max_by_key(|(_, s)| s.seq)
            .map(|(token, _)| SessionToken::new(token.clone()));
        Ok(newest)
    }

    async fn open_session(&self, bucket: &str, key: &str) -> Result<SessionToken> {
        let mut state = self.state.lock();
        let token = Uuid::new_v4().simple().to_string();
        state.next_seq += 1;
        let seq = state.next_seq;
        state.sessions.insert(
            token.clone(),
            Session {
                bucket: bucket.to_string(),
                key: key.to_string(),
                seq,
                parts: BTreeMap::new(),
            },
        );
        debug!(bucket, key, token = %token, "Opened session");
        Ok(SessionToken::new(token))
    }

    async fn list_committed_parts(
        &self,
        session: &SessionHandle,
        cursor: Option<u32>,
    ) -> Result<PartPage> {
        let mut state = self.state.lock();
        state.list_calls += 1;

        let stored = state
            .sessions
            .get(session.token.as_str())
            .ok_or_else(|| Self::session_mismatch(StoreOp::ListParts, session))?;

        let after = cursor.unwrap_or(0);
        let mut remaining = stored.parts.range(after + 1..);
        let parts: Vec<CommittedPart> = remaining
            .by_ref()
            .take(self.page_size)
            .map(|(number, part)| CommittedPart {
                part_number: *number,
                size: part.data.len() as u64,
                tag: part.tag.clone(),
            })
            .collect();

        let next_cursor = match (remaining.next(), parts.last()) {
            (Some(_), Some(last)) => Some(last.part_number),
            _ => None,
        };

        Ok(PartPage { parts, next_cursor })
    }

    async fn upload_part(
        &self,
        session: &SessionHandle,
        part_number: u32,
        range: ByteRange,
        data: Bytes,
    ) -> Result<IntegrityTag> {
        let op = StoreOp::UploadPart(part_number);
        let mut state = self.state.lock();

        if state.failing_parts.contains(&part_number) {
            return Err(Error::store(op, "InternalError: injected failure"));
        }
        if data.len() as u64 != range.length {
            return Err(Error::store(
                op,
                format!(
                    "IncompleteBody: got {} bytes for range {}",
                    data.len(),
                    range
                ),
            ));
        }

        let tag = IntegrityTag::new(quoted_md5(&data));
        let stored = state
            .sessions
            .get_mut(session.token.as_str())
            .ok_or_else(|| Self::session_mismatch(op, session))?;
        stored.parts.insert(
            part_number,
            StoredPart {
                data,
                tag: tag.clone(),
            },
        );
        state.upload_log.push(part_number);

        Ok(tag)
    }

    async fn complete_session(
        &self,
        session: &SessionHandle,
        parts: &[CompletedPart],
    ) -> Result<ObjectHandle> {
        let op = StoreOp::CompleteSession;
        let mut state = self.state.lock();

        let stored = state
            .sessions
            .get(session.token.as_str())
            .ok_or_else(|| Self::session_mismatch(op, session))?;

        if parts.is_empty() {
            return Err(Error::store(op, "MalformedXML: no parts"));
        }

        let mut body = Vec::new();
        let mut digests = Vec::with_capacity(parts.len() * 16);
        let mut previous = 0u32;
        for (i, part) in parts.iter().enumerate() {
            if part.part_number <= previous {
                return Err(Error::store(op, "InvalidPartOrder"));
            }
            previous = part.part_number;

            let stored_part = stored.parts.get(&part.part_number).ok_or_else(|| {
                Error::store(op, format!("InvalidPart: {} not uploaded", part.part_number))
            })?;
            if stored_part.tag != part.tag {
                return Err(Error::store(
                    op,
                    format!("InvalidPart: tag mismatch on {}", part.part_number),
                ));
            }
            let is_last = i + 1 == parts.len();
            if !is_last && (stored_part.data.len() as u64) < self.min_part_size {
                return Err(Error::store(
                    op,
                    format!("EntityTooSmall: part {}", part.part_number),
                ));
            }
            body.extend_from_slice(&stored_part.data);
            digests.extend_from_slice(&Md5::digest(&stored_part.data));
        }

        let etag = format!("\"{}-{}\"", hex::encode(Md5::digest(&digests)), parts.len());
        state.sessions.remove(session.token.as_str());
        state.objects.insert(
            (session.bucket.clone(), session.key.clone()),
            StoredObject {
                data: Bytes::from(body),
                etag: etag.clone(),
            },
        );

        Ok(ObjectHandle {
            bucket: session.bucket.clone(),
            key: session.key.clone(),
            etag: Some(etag),
        })
    }

    async fn abort_session(&self, session: &SessionHandle) -> Result<()> {
        let mut state = self.state.lock();
        state
            .sessions
            .remove(session.token.as_str())
            .map(|_| ())
            .ok_or_else(|| Self::session_mismatch(StoreOp::AbortSession, session))
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<ObjectHandle> {
        let etag = quoted_md5(&data);
        self.state.lock().objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data,
                etag: etag.clone(),
            },
        );
        Ok(ObjectHandle {
            bucket: bucket.to_string(),
            key: key.to_string(),
            etag: Some(etag),
        })
    }

    async fn object_metadata(&self, bucket: &str, key: &str) -> Result<ObjectMetadata> {
        let state = self.state.lock();
        let object = state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| {
                Error::store(StoreOp::ObjectMetadata, format!("NoSuchKey: {}/{}", bucket, key))
            })?;
        Ok(ObjectMetadata {
            size: object.data.len() as u64,
            etag: Some(object.etag.clone()),
        })
    }

    async fn open_object_stream(&self, bucket: &str, key: &str) -> Result<ObjectStream> {
        let state = self.state.lock();
        let object = state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| {
                Error::store(StoreOp::OpenStream, format!("NoSuchKey: {}/{}", bucket, key))
            })?;

        let mut data = object.data.clone();
        if let Some(limit) = state.stream_limit {
            data.truncate(limit);
        }
        Ok(Box::pin(Cursor::new(data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    async fn seeded(store: &MemoryStore, parts: &[&[u8]]) -> SessionHandle {
        let token = store.open_session("b", "k").await.unwrap();
        let handle = SessionHandle::new("b", "k", token);
        let mut offset = 0u64;
        for (i, data) in parts.iter().enumerate() {
            let range = ByteRange::new(offset, data.len() as u64);
            store
                .upload_part(&handle, i as u32 + 1, range, Bytes::copy_from_slice(data))
                .await
                .unwrap();
            offset += data.len() as u64;
        }
        handle
    }

    #[tokio::test]
    async fn test_listing_is_paged() {
        let store = MemoryStore::new().with_page_size(2);
        let handle = seeded(&store, &[b"a", b"b", b"c", b"d", b"e"]).await;

        let first = store.list_committed_parts(&handle, None).await.unwrap();
        assert_eq!(first.parts.len(), 2);
        assert_eq!(first.next_cursor, Some(2));

        let last = store.list_committed_parts(&handle, Some(4)).await.unwrap();
        assert_eq!(last.parts.len(), 1);
        assert_eq!(last.parts[0].part_number, 5);
        assert_eq!(last.next_cursor, None);
    }

    #[tokio::test]
    async fn test_find_open_session_prefers_newest() {
        let store = MemoryStore::new();
        let _old = store.open_session("b", "k").await.unwrap();
        let new = store.open_session("b", "k").await.unwrap();
        store.open_session("b", "other").await.unwrap();

        assert_eq!(store.find_open_session("b", "k").await.unwrap(), Some(new));
        assert_eq!(store.find_open_session("b", "none").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_complete_assembles_object() {
        let store = MemoryStore::new();
        let handle = seeded(&store, &[b"hello ", b"world"]).await;
        let page = store.list_committed_parts(&handle, None).await.unwrap();
        let parts: Vec<CompletedPart> = page
            .parts
            .iter()
            .map(|p| CompletedPart {
                part_number: p.part_number,
                tag: p.tag.clone(),
            })
            .collect();

        let object = store.complete_session(&handle, &parts).await.unwrap();
        assert!(object.etag.unwrap().ends_with("-2\""));
        assert_eq!(store.object("b", "k").unwrap(), Bytes::from_static(b"hello world"));
        assert_eq!(store.open_sessions("b", "k"), 0);
    }

    #[tokio::test]
    async fn test_complete_rejects_small_parts() {
        let store = MemoryStore::new().with_min_part_size(4);
        let handle = seeded(&store, &[b"ab", b"cd"]).await;
        let page = store.list_committed_parts(&handle, None).await.unwrap();
        let parts: Vec<CompletedPart> = page
            .parts
            .iter()
            .map(|p| CompletedPart {
                part_number: p.part_number,
                tag: p.tag.clone(),
            })
            .collect();

        let err = store.complete_session(&handle, &parts).await.unwrap_err();
        assert!(err.to_string().contains("EntityTooSmall"));
    }

    #[tokio::test]
    async fn test_injected_failure_and_heal() {
        let store = MemoryStore::new();
        let handle = seeded(&store, &[]).await;
        store.fail_part(1);

        let err = store
            .upload_part(&handle, 1, ByteRange::new(0, 1), Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.part_number(), Some(1));

        store.heal();
        store
            .upload_part(&handle, 1, ByteRange::new(0, 1), Bytes::from_static(b"x"))
            .await
            .unwrap();
        assert_eq!(store.upload_log(), vec![1]);
    }

    #[tokio::test]
    async fn test_truncated_stream() {
        let store = MemoryStore::new();
        store.insert_object("b", "k", b"0123456789".to_vec());
        store.truncate_streams(4);

        let mut stream = store.open_object_stream("b", "k").await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"0123");
        assert_eq!(store.object_metadata("b", "k").await.unwrap().size, 10);
    }
}
