//! Upload coordinator
//!
//! Splits a local file into fixed-size parts, resumes any open session for
//! the destination key, uploads only the parts the store does not already
//! hold and finalizes once every part is accounted for.
//!
//! Progress counts bytes as they are read from the source into a part's
//! buffer, before that part is sent. A part the store then rejects has
//! already been reported, so a failed call can end with progress past the
//! bytes the store actually holds.

use std::io::{self, SeekFrom};
use std::path::Path;
use std::time::Instant;

use bytes::Bytes;
use partwise_core::types::{
    ByteRange, CompletedPart, PartDescriptor, PartPlan, SessionHandle, TransferDirection, TransferSession,
    TransferSummary,
};
use partwise_core::{Error, PartSizeConflict, Result, TransferConfig, MAX_PARTS};
use partwise_store::ObjectStore;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info, warn};

use crate::ledger::PartLedger;
use crate::metrics;
use crate::progress::{ProgressReader, ProgressTracker};
use crate::TransferOptions;

/// Drives one upload call against a store
pub struct UploadCoordinator<'a> {
    store: &'a dyn ObjectStore,
    config: &'a TransferConfig,
}

impl<'a> UploadCoordinator<'a> {
    pub fn new(store: &'a dyn ObjectStore, config: &'a TransferConfig) -> Self {
        Self { store, config }
    }

    /// Upload `path` to `bucket/key` in parts of `part_size` bytes, resuming
    /// an open session for the key when there is one.
    pub async fn upload(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        part_size: u64,
        options: &TransferOptions,
    ) -> Result<TransferSummary> {
        let started = Instant::now();
        let result = self.run(bucket, key, path, part_size, options).await;
        metrics::record_transfer(
            TransferDirection::Upload,
            result.is_ok(),
            started.elapsed().as_secs_f64(),
        );

        let mut summary = result?;
        summary.elapsed = started.elapsed();
        info!(
            bucket,
            key,
            bytes = summary.bytes_transferred,
            uploaded = summary.parts_uploaded,
            skipped = summary.parts_skipped,
            "Upload complete"
        );
        Ok(summary)
    }

    /// Upload `path` in a single request. Not resumable.
    pub async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        options: &TransferOptions,
    ) -> Result<TransferSummary> {
        let started = Instant::now();
        let result = self.put(bucket, key, path, options).await;
        metrics::record_transfer(
            TransferDirection::Upload,
            result.is_ok(),
            started.elapsed().as_secs_f64(),
        );

        let mut summary = result?;
        summary.elapsed = started.elapsed();
        Ok(summary)
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        options: &TransferOptions,
    ) -> Result<TransferSummary> {
        options.check_cancelled()?;

        let mut file = File::open(path).await?;
        let total = file.metadata().await?.len();
        let tracker = ProgressTracker::new(total, options.progress.clone());

        let data = read_range(&mut file, ByteRange::new(0, total), &tracker).await?;
        let object = self.store.put_object(bucket, key, data).await?;
        tracker.finish();
        metrics::record_bytes_uploaded(total);
        debug!(bucket, key, size = total, "Stored object in a single request");

        let mut summary = TransferSummary::new(TransferDirection::Upload, bucket, key, total);
        summary.bytes_transferred = total;
        summary.etag = object.etag;
        Ok(summary)
    }

    async fn run(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        part_size: u64,
        options: &TransferOptions,
    ) -> Result<TransferSummary> {
        self.check_part_size(part_size)?;

        let mut file = File::open(path).await?;
        let total = file.metadata().await?.len();
        let tracker = ProgressTracker::new(total, options.progress.clone());
        let mut summary = TransferSummary::new(TransferDirection::Upload, bucket, key, total);

        if total == 0 {
            debug!(bucket, key, "Empty source, storing empty object");
            let object = self.store.put_object(bucket, key, Bytes::new()).await?;
            tracker.finish();
            summary.etag = object.etag;
            return Ok(summary);
        }

        let (plan, part_count) = checked_plan(total, part_size)?;

        options.check_cancelled()?;
        let (session, ledger) = self.resolve_session(bucket, key, &plan, part_count).await?;
        summary.resumed = session.resumed;

        for part_number in ledger.beyond(&plan) {
            warn!(
                session = %session.handle,
                part = part_number,
                "Ignoring committed part past the end of the source"
            );
        }

        let mut parts = ledger.descriptors(&plan);
        let mut offset = 0u64;

        for part in parts.iter_mut() {
            if part.committed {
                debug!(part = part.part_number, size = part.range.length, "Part already committed");
                tracker.skip(part.range.length);
                offset += part.range.length;
                summary.parts_skipped += 1;
                metrics::record_part_skipped();
                continue;
            }

            options.check_cancelled()?;

            let data = read_part(&mut file, part.part_number, part.range, &tracker).await?;
            let tag = self
                .store
                .upload_part(&session.handle, part.part_number, part.range, data)
                .await
                .map_err(|e| {
                    warn!(
                        session = %session.handle,
                        part = part.part_number,
                        error = %e,
                        "Part upload failed, session left open for resume"
                    );
                    e
                })?;

            debug!(part = part.part_number, range = %part.range, "Uploaded part");
            offset += part.range.length;
            summary.parts_uploaded += 1;
            summary.bytes_transferred += part.range.length;
            metrics::record_part_uploaded(part.range.length);
            part.tag = Some(tag);
            part.committed = true;
        }

        let completed: Vec<CompletedPart> =
            parts.iter().filter_map(PartDescriptor::completed).collect();
        verify_complete(&completed, part_count, offset, total)?;

        let object = self
            .store
            .complete_session(&session.handle, &completed)
            .await?;
        tracker.finish();
        summary.etag = object.etag;
        Ok(summary)
    }

    fn check_part_size(&self, part_size: u64) -> Result<()> {
        if part_size == 0 || part_size < self.config.min_part_size {
            return Err(Error::InvalidArgument(format!(
                "part size {} is below the minimum of {}",
                part_size, self.config.min_part_size
            )));
        }
        Ok(())
    }

    /// Reuse an open session whose parts fit `plan`, or open a new one
    async fn resolve_session(
        &self,
        bucket: &str,
        key: &str,
        plan: &PartPlan,
        part_count: u32,
    ) -> Result<(TransferSession, PartLedger)> {
        if let Some(token) = self.store.find_open_session(bucket, key).await? {
            let handle = SessionHandle::new(bucket, key, token);
            let ledger = PartLedger::fetch(self.store, &handle).await?;

            match ledger.check_plan(plan) {
                Ok(()) => {
                    info!(
                        session = %handle,
                        committed = ledger.len(),
                        bytes = ledger.committed_bytes(),
                        "Resuming upload"
                    );
                    let session = TransferSession {
                        handle,
                        part_size: plan.part_size,
                        total_size: plan.total_size,
                        resumed: true,
                    };
                    return Ok((session, ledger));
                }
                Err(err) => match self.config.on_part_size_conflict {
                    PartSizeConflict::Reject => {
                        warn!(session = %handle, error = %err, "Open session uses another part size");
                        return Err(err);
                    }
                    PartSizeConflict::Restart => {
                        warn!(session = %handle, error = %err, "Aborting session with another part size");
                        self.store.abort_session(&handle).await?;
                    }
                },
            }
        }

        let token = self.store.open_session(bucket, key).await?;
        let handle = SessionHandle::new(bucket, key, token);
        info!(session = %handle, parts = part_count, "Started upload session");

        let session = TransferSession {
            handle,
            part_size: plan.part_size,
            total_size: plan.total_size,
            resumed: false,
        };
        Ok((session, PartLedger::default()))
    }
}

/// Lay out `total` bytes in parts of `part_size`, refusing layouts that need
/// more parts than a session can hold
pub(crate) fn checked_plan(total: u64, part_size: u64) -> Result<(PartPlan, u32)> {
    let plan = PartPlan::new(total, part_size);
    match plan.part_count() {
        Some(count) if count <= MAX_PARTS => Ok((plan, count)),
        _ => Err(Error::InvalidArgument(format!(
            "{} bytes in parts of {} needs more than {} parts",
            total, part_size, MAX_PARTS
        ))),
    }
}

/// Finalize gate: the recorded parts must be exactly `1..=steps`, in order,
/// and the parts walked must cover `total` bytes.
pub fn verify_complete(
    completed: &[CompletedPart],
    steps: u32,
    accounted: u64,
    total: u64,
) -> Result<()> {
    let contiguous = completed
        .iter()
        .enumerate()
        .all(|(i, part)| part.part_number as usize == i + 1);

    if contiguous && completed.len() == steps as usize && accounted == total {
        return Ok(());
    }

    let missing = (1..=steps)
        .filter(|n| !completed.iter().any(|p| p.part_number == *n))
        .collect();
    Err(Error::IncompleteTransfer {
        expected: steps,
        recorded: completed.len() as u32,
        missing,
    })
}

/// Read one part's bytes from the source
async fn read_part(
    file: &mut File,
    part_number: u32,
    range: ByteRange,
    tracker: &ProgressTracker,
) -> Result<Bytes> {
    read_range(file, range, tracker)
        .await
        .map_err(|source| Error::SourceRead {
            part_number,
            source,
        })
}

/// Read exactly `range` of `file`, counting the bytes on `tracker`
async fn read_range(
    file: &mut File,
    range: ByteRange,
    tracker: &ProgressTracker,
) -> io::Result<Bytes> {
    file.seek(SeekFrom::Start(range.offset)).await?;

    let mut reader = ProgressReader::new((&mut *file).take(range.length), tracker.clone());
    let mut buf = Vec::with_capacity(range.length as usize);
    reader.read_to_end(&mut buf).await?;

    if buf.len() as u64 != range.length {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "source ended after {} of {} bytes in range {}",
                buf.len(),
                range.length,
                range
            ),
        ));
    }
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProgressCallback;
    use parking_lot::Mutex;
    use partwise_core::types::IntegrityTag;
    use partwise_store::MemoryStore;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    const PART: u64 = 16;

    fn test_config() -> TransferConfig {
        TransferConfig {
            part_size: PART,
            min_part_size: 8,
            buffer_size: 7,
            ..Default::default()
        }
    }

    fn test_store() -> MemoryStore {
        MemoryStore::new().with_min_part_size(8)
    }

    fn source(dir: &TempDir, len: usize) -> (std::path::PathBuf, Vec<u8>) {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let path = dir.path().join("source.bin");
        std::fs::write(&path, &data).unwrap();
        (path, data)
    }

    async fn seed(store: &MemoryStore, data: &[u8], parts: std::ops::RangeInclusive<u32>) {
        let token = store.open_session("b", "k").await.unwrap();
        let handle = SessionHandle::new("b", "k", token);
        let plan = PartPlan::new(data.len() as u64, PART);
        for n in parts {
            let range = plan.range_of(n).unwrap();
            let chunk = &data[range.offset as usize..range.end() as usize];
            store
                .upload_part(&handle, n, range, Bytes::copy_from_slice(chunk))
                .await
                .unwrap();
        }
    }

    fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<u64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let cb: ProgressCallback = Arc::new(move |done, _| s.lock().push(done));
        (cb, seen)
    }

    #[tokio::test]
    async fn test_upload_splits_into_parts() {
        let dir = TempDir::new().unwrap();
        let (path, data) = source(&dir, 7 * PART as usize + 5);
        let store = test_store();
        let config = test_config();

        let summary = UploadCoordinator::new(&store, &config)
            .upload("b", "k", &path, PART, &TransferOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.parts_uploaded, 8);
        assert_eq!(summary.parts_skipped, 0);
        assert!(!summary.resumed);
        assert_eq!(summary.bytes_transferred, data.len() as u64);
        assert_eq!(store.upload_log(), (1..=8).collect::<Vec<_>>());
        assert_eq!(store.object("b", "k").unwrap().as_ref(), data.as_slice());
        assert_eq!(store.open_sessions("b", "k"), 0);
    }

    #[tokio::test]
    async fn test_resume_uploads_only_missing_parts() {
        let dir = TempDir::new().unwrap();
        let (path, data) = source(&dir, 7 * PART as usize + 5);
        let store = test_store();
        seed(&store, &data, 1..=3).await;
        let config = test_config();

        let summary = UploadCoordinator::new(&store, &config)
            .upload("b", "k", &path, PART, &TransferOptions::default())
            .await
            .unwrap();

        assert!(summary.resumed);
        assert_eq!(summary.parts_skipped, 3);
        assert_eq!(summary.parts_uploaded, 5);
        assert_eq!(summary.bytes_transferred, data.len() as u64 - 3 * PART);
        assert_eq!(store.upload_log(), (1..=8).collect::<Vec<_>>());
        assert_eq!(store.object("b", "k").unwrap().as_ref(), data.as_slice());
    }

    #[tokio::test]
    async fn test_failed_part_resumes_without_reupload() {
        let dir = TempDir::new().unwrap();
        let (path, data) = source(&dir, 6 * PART as usize);
        let store = test_store();
        let config = test_config();
        let coordinator = UploadCoordinator::new(&store, &config);

        store.fail_part(4);
        let err = coordinator
            .upload("b", "k", &path, PART, &TransferOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "StoreError");
        assert_eq!(err.part_number(), Some(4));
        assert!(err.is_resumable());
        assert_eq!(store.open_sessions("b", "k"), 1);
        assert!(store.object("b", "k").is_none());

        store.heal();
        let summary = coordinator
            .upload("b", "k", &path, PART, &TransferOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.parts_skipped, 3);
        assert_eq!(store.upload_log(), (1..=6).collect::<Vec<_>>());
        assert_eq!(store.object("b", "k").unwrap().as_ref(), data.as_slice());
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_finishes_once() {
        let dir = TempDir::new().unwrap();
        let (path, data) = source(&dir, 4 * PART as usize + 3);
        let total = data.len() as u64;
        let store = test_store();
        seed(&store, &data, 1..=2).await;
        let config = test_config();
        let (cb, seen) = recorder();

        UploadCoordinator::new(&store, &config)
            .upload("b", "k", &path, PART, &TransferOptions::default().with_progress(cb))
            .await
            .unwrap();

        let seen = seen.lock();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert!(seen[0] > 2 * PART);
        assert_eq!(seen.last(), Some(&total));
        assert_eq!(seen.iter().filter(|v| **v == total).count(), 1);
    }

    #[tokio::test]
    async fn test_empty_source_skips_part_path() {
        let dir = TempDir::new().unwrap();
        let (path, _) = source(&dir, 0);
        let store = test_store();
        let config = test_config();
        let (cb, seen) = recorder();

        let summary = UploadCoordinator::new(&store, &config)
            .upload("b", "k", &path, PART, &TransferOptions::default().with_progress(cb))
            .await
            .unwrap();

        assert_eq!(summary.total_bytes, 0);
        assert!(store.upload_log().is_empty());
        assert_eq!(store.open_sessions("b", "k"), 0);
        assert!(store.object("b", "k").unwrap().is_empty());
        assert_eq!(*seen.lock(), vec![0]);
    }

    #[tokio::test]
    async fn test_ledger_is_paged_on_resume() {
        let dir = TempDir::new().unwrap();
        let (path, data) = source(&dir, 8 * PART as usize);
        let store = test_store().with_page_size(2);
        seed(&store, &data, 1..=5).await;
        let config = test_config();

        let summary = UploadCoordinator::new(&store, &config)
            .upload("b", "k", &path, PART, &TransferOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.parts_skipped, 5);
        assert_eq!(store.upload_log(), (1..=8).collect::<Vec<_>>());
        assert!(store.list_calls() >= 3);
        assert_eq!(store.object("b", "k").unwrap().as_ref(), data.as_slice());
    }

    #[tokio::test]
    async fn test_part_size_conflict_rejected() {
        let dir = TempDir::new().unwrap();
        let (path, data) = source(&dir, 4 * PART as usize);
        let store = test_store();
        let token = store.open_session("b", "k").await.unwrap();
        let handle = SessionHandle::new("b", "k", token);
        store
            .upload_part(&handle, 1, ByteRange::new(0, 8), Bytes::copy_from_slice(&data[..8]))
            .await
            .unwrap();
        let config = test_config();

        let err = UploadCoordinator::new(&store, &config)
            .upload("b", "k", &path, PART, &TransferOptions::default())
            .await
            .unwrap_err();

        match err {
            Error::PartSizeMismatch {
                part_number,
                expected,
                found,
            } => {
                assert_eq!(part_number, 1);
                assert_eq!(expected, PART);
                assert_eq!(found, 8);
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
        assert_eq!(store.open_sessions("b", "k"), 1);
        assert_eq!(store.upload_log(), vec![1]);
    }

    #[tokio::test]
    async fn test_part_size_conflict_restarts() {
        let dir = TempDir::new().unwrap();
        let (path, data) = source(&dir, 4 * PART as usize);
        let store = test_store();
        let token = store.open_session("b", "k").await.unwrap();
        let handle = SessionHandle::new("b", "k", token);
        store
            .upload_part(&handle, 1, ByteRange::new(0, 8), Bytes::copy_from_slice(&data[..8]))
            .await
            .unwrap();
        let config = TransferConfig {
            on_part_size_conflict: PartSizeConflict::Restart,
            ..test_config()
        };

        let summary = UploadCoordinator::new(&store, &config)
            .upload("b", "k", &path, PART, &TransferOptions::default())
            .await
            .unwrap();

        assert!(!summary.resumed);
        assert_eq!(summary.parts_uploaded, 4);
        assert_eq!(store.open_sessions("b", "k"), 0);
        assert_eq!(store.object("b", "k").unwrap().as_ref(), data.as_slice());
    }

    /// Open session for a 52-byte source cut into 20-byte parts, holding only
    /// part 2 (bytes 20..40). Under 32-byte parts, part 2 is also 20 bytes long
    /// but covers bytes 32..52.
    async fn seed_stale_tail(store: &MemoryStore, data: &[u8]) {
        let token = store.open_session("b", "k").await.unwrap();
        let handle = SessionHandle::new("b", "k", token);
        store
            .upload_part(&handle, 2, ByteRange::new(20, 20), Bytes::copy_from_slice(&data[20..40]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stale_short_part_is_a_conflict() {
        let dir = TempDir::new().unwrap();
        let (path, data) = source(&dir, 52);
        let store = test_store();
        seed_stale_tail(&store, &data).await;
        let config = test_config();

        let err = UploadCoordinator::new(&store, &config)
            .upload("b", "k", &path, 32, &TransferOptions::default())
            .await
            .unwrap_err();

        match err {
            Error::PartSizeMismatch {
                part_number,
                expected,
                found,
            } => {
                assert_eq!(part_number, 2);
                assert_eq!(expected, 32);
                assert_eq!(found, 20);
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
        assert!(store.object("b", "k").is_none());
        assert_eq!(store.open_sessions("b", "k"), 1);
    }

    #[tokio::test]
    async fn test_stale_short_part_restart_stores_source() {
        let dir = TempDir::new().unwrap();
        let (path, data) = source(&dir, 52);
        let store = test_store();
        seed_stale_tail(&store, &data).await;
        let config = TransferConfig {
            on_part_size_conflict: PartSizeConflict::Restart,
            ..test_config()
        };

        let summary = UploadCoordinator::new(&store, &config)
            .upload("b", "k", &path, 32, &TransferOptions::default())
            .await
            .unwrap();

        assert!(!summary.resumed);
        assert_eq!(summary.parts_uploaded, 2);
        assert_eq!(summary.parts_skipped, 0);
        assert_eq!(store.object("b", "k").unwrap().as_ref(), data.as_slice());
    }

    #[tokio::test]
    async fn test_progress_counts_part_read_before_send() {
        let dir = TempDir::new().unwrap();
        let (path, _) = source(&dir, 4 * PART as usize);
        let store = test_store();
        store.fail_part(2);
        let config = test_config();
        let (cb, seen) = recorder();

        let err = UploadCoordinator::new(&store, &config)
            .upload("b", "k", &path, PART, &TransferOptions::default().with_progress(cb))
            .await
            .unwrap_err();

        assert_eq!(err.part_number(), Some(2));
        // Part 2 was read in full before the store refused it
        assert_eq!(seen.lock().last(), Some(&(2 * PART)));
        assert_eq!(store.upload_log(), vec![1]);
    }

    #[tokio::test]
    async fn test_short_source_read_names_part() {
        let dir = TempDir::new().unwrap();
        let (path, _) = source(&dir, 40);
        let mut file = File::open(&path).await.unwrap();
        let tracker = ProgressTracker::new(64, None);

        let err = read_part(&mut file, 3, ByteRange::new(32, 16), &tracker)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "IOError");
        assert_eq!(err.part_number(), Some(3));
        match err {
            Error::SourceRead { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof)
            }
            other => panic!("expected source read error, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_part_count_is_bounded() {
        let (_, count) = checked_plan(MAX_PARTS as u64 * 16, 16).unwrap();
        assert_eq!(count, MAX_PARTS);

        let err = checked_plan(MAX_PARTS as u64 * 16 + 1, 16).unwrap_err();
        assert_eq!(err.code(), "InvalidArgument");

        let err = checked_plan(u64::MAX, 1).unwrap_err();
        assert_eq!(err.code(), "InvalidArgument");
    }

    #[tokio::test]
    async fn test_cancelled_before_first_part() {
        let dir = TempDir::new().unwrap();
        let (path, _) = source(&dir, 3 * PART as usize);
        let store = test_store();
        let config = test_config();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = UploadCoordinator::new(&store, &config)
            .upload("b", "k", &path, PART, &TransferOptions::default().with_cancel(cancel))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert!(store.upload_log().is_empty());
    }

    #[tokio::test]
    async fn test_part_size_below_minimum() {
        let dir = TempDir::new().unwrap();
        let (path, _) = source(&dir, 100);
        let store = test_store();
        let config = test_config();

        let err = UploadCoordinator::new(&store, &config)
            .upload("b", "k", &path, 4, &TransferOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.code(), "InvalidArgument");
        assert_eq!(store.open_sessions("b", "k"), 0);
    }

    #[tokio::test]
    async fn test_missing_source_is_io_error() {
        let dir = TempDir::new().unwrap();
        let store = test_store();
        let config = test_config();

        let err = UploadCoordinator::new(&store, &config)
            .upload("b", "k", &dir.path().join("nope"), PART, &TransferOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.code(), "IOError");
        assert!(!err.is_resumable());
    }

    #[tokio::test]
    async fn test_put_file_single_request() {
        let dir = TempDir::new().unwrap();
        let (path, data) = source(&dir, 50);
        let store = test_store();
        let config = test_config();
        let (cb, seen) = recorder();

        let summary = UploadCoordinator::new(&store, &config)
            .put_file("b", "k", &path, &TransferOptions::default().with_progress(cb))
            .await
            .unwrap();

        assert_eq!(summary.bytes_transferred, 50);
        assert!(summary.etag.is_some());
        assert!(store.upload_log().is_empty());
        assert_eq!(store.object("b", "k").unwrap().as_ref(), data.as_slice());
        assert_eq!(seen.lock().last(), Some(&50));
    }

    fn completed(numbers: &[u32]) -> Vec<CompletedPart> {
        numbers
            .iter()
            .map(|n| CompletedPart {
                part_number: *n,
                tag: IntegrityTag::new(format!("t{}", n)),
            })
            .collect()
    }

    #[test]
    fn test_gate_accepts_contiguous_parts() {
        assert!(verify_complete(&completed(&[1, 2, 3, 4]), 4, 100, 100).is_ok());
    }

    #[test]
    fn test_gate_reports_gap() {
        match verify_complete(&completed(&[1, 2, 4]), 4, 100, 100) {
            Err(Error::IncompleteTransfer {
                expected,
                recorded,
                missing,
            }) => {
                assert_eq!(expected, 4);
                assert_eq!(recorded, 3);
                assert_eq!(missing, vec![3]);
            }
            other => panic!("expected incomplete transfer, got {:?}", other),
        }
    }

    #[test]
    fn test_gate_rejects_short_coverage() {
        let err = verify_complete(&completed(&[1, 2]), 2, 90, 100).unwrap_err();
        assert_eq!(err.code(), "IncompleteTransferError");
    }
}
