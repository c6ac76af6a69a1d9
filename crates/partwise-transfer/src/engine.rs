//! Caller-facing transfer engine

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use partwise_core::types::{PendingUpload, SessionHandle, TransferSummary};
use partwise_core::{Error, Result, TransferConfig};
use partwise_store::ObjectStore;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::download::DownloadStreamer;
use crate::ledger::PartLedger;
use crate::progress::ProgressCallback;
use crate::upload::UploadCoordinator;

/// Per-call hooks: progress reporting and cancellation
#[derive(Clone, Default)]
pub struct TransferOptions {
    pub progress: Option<ProgressCallback>,
    pub cancel: Option<CancellationToken>,
}

impl TransferOptions {
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for TransferOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferOptions")
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// Uploads and downloads against one object store
#[derive(Clone)]
pub struct TransferEngine {
    store: Arc<dyn ObjectStore>,
    config: TransferConfig,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn ObjectStore>, config: TransferConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Resumable multipart upload of `path` to `bucket/key`
    pub async fn upload(
        &self,
        bucket: &str,
        key: &str,
        path: impl AsRef<Path>,
        part_size: u64,
        options: TransferOptions,
    ) -> Result<TransferSummary> {
        UploadCoordinator::new(self.store.as_ref(), &self.config)
            .upload(bucket, key, path.as_ref(), part_size, &options)
            .await
    }

    /// Single-request upload of `path`, for small files
    pub async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: impl AsRef<Path>,
        options: TransferOptions,
    ) -> Result<TransferSummary> {
        UploadCoordinator::new(self.store.as_ref(), &self.config)
            .put_file(bucket, key, path.as_ref(), &options)
            .await
    }

    pub async fn download(
        &self,
        bucket: &str,
        key: &str,
        path: impl AsRef<Path>,
        options: TransferOptions,
    ) -> Result<TransferSummary> {
        DownloadStreamer::new(self.store.as_ref(), &self.config)
            .download(bucket, key, path.as_ref(), &options)
            .await
    }

    /// Abort the open session for `bucket/key`. Returns false if there was none.
    pub async fn abort(&self, bucket: &str, key: &str) -> Result<bool> {
        let Some(token) = self.store.find_open_session(bucket, key).await? else {
            return Ok(false);
        };
        let handle = SessionHandle::new(bucket, key, token);
        self.store.abort_session(&handle).await?;
        info!(session = %handle, "Aborted upload session");
        Ok(true)
    }

    /// The open session for `bucket/key` and what it already holds
    pub async fn pending(&self, bucket: &str, key: &str) -> Result<Option<PendingUpload>> {
        let Some(token) = self.store.find_open_session(bucket, key).await? else {
            return Ok(None);
        };
        let handle = SessionHandle::new(bucket, key, token);
        let ledger = PartLedger::fetch(self.store.as_ref(), &handle).await?;

        Ok(Some(PendingUpload {
            committed_parts: ledger.len() as u32,
            committed_bytes: ledger.committed_bytes(),
            part_size_hint: ledger.part_size_hint(),
            handle,
            checked_at: Utc::now(),
        }))
    }
}
