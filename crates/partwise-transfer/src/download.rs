//! Download streamer
//!
//! Copies an object's byte stream into a local file. Downloads always start
//! from the first byte; an interrupted download leaves a partial file.

use std::io;
use std::path::Path;
use std::time::Instant;

use partwise_core::types::{TransferDirection, TransferSummary};
use partwise_core::{Result, TransferConfig};
use partwise_store::ObjectStore;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::metrics;
use crate::progress::{ProgressTracker, ProgressWriter};
use crate::TransferOptions;

pub struct DownloadStreamer<'a> {
    store: &'a dyn ObjectStore,
    config: &'a TransferConfig,
}

impl<'a> DownloadStreamer<'a> {
    pub fn new(store: &'a dyn ObjectStore, config: &'a TransferConfig) -> Self {
        Self { store, config }
    }

    /// Download `bucket/key` into `dest`, creating or truncating it
    pub async fn download(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
        options: &TransferOptions,
    ) -> Result<TransferSummary> {
        let started = Instant::now();
        let result = self.run(bucket, key, dest, options).await;
        metrics::record_transfer(
            TransferDirection::Download,
            result.is_ok(),
            started.elapsed().as_secs_f64(),
        );

        let mut summary = result?;
        summary.elapsed = started.elapsed();
        info!(
            bucket,
            key,
            dest = %dest.display(),
            bytes = summary.bytes_transferred,
            "Download complete"
        );
        Ok(summary)
    }

    async fn run(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
        options: &TransferOptions,
    ) -> Result<TransferSummary> {
        options.check_cancelled()?;

        let metadata = self.store.object_metadata(bucket, key).await?;
        let mut stream = self.store.open_object_stream(bucket, key).await?;
        debug!(bucket, key, size = metadata.size, "Opened object stream");

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let file = File::create(dest).await?;

        let tracker = ProgressTracker::new(metadata.size, options.progress.clone());
        let mut writer = ProgressWriter::new(file, tracker.clone());
        let mut buf = vec![0u8; self.config.buffer_size.max(1)];
        let mut copied = 0u64;

        loop {
            options.check_cancelled()?;
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            writer.write_all(&buf[..n]).await?;
            copied += n as u64;
        }
        writer.flush().await?;
        metrics::record_bytes_downloaded(copied);

        if copied != metadata.size {
            warn!(
                bucket,
                key,
                copied,
                expected = metadata.size,
                "Object stream length differs from metadata"
            );
            let kind = if copied < metadata.size {
                io::ErrorKind::UnexpectedEof
            } else {
                io::ErrorKind::InvalidData
            };
            return Err(io::Error::new(
                kind,
                format!(
                    "stream for {}/{} delivered {} of {} bytes",
                    bucket, key, copied, metadata.size
                ),
            )
            .into());
        }

        writer.into_inner().sync_all().await?;
        tracker.finish();

        let mut summary =
            TransferSummary::new(TransferDirection::Download, bucket, key, metadata.size);
        summary.bytes_transferred = copied;
        summary.etag = metadata.etag;
        Ok(summary)
    }
}
