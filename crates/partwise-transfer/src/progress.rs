//! Progress reporting for transfers
//!
//! A [`ProgressTracker`] counts bytes against a known total and forwards
//! updates to a caller-supplied callback. [`ProgressReader`] and
//! [`ProgressWriter`] feed a tracker from any async byte source or sink.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Callback invoked with `(bytes_so_far, total_bytes)`.
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Shared byte counter for one transfer.
///
/// Reported values never decrease. The value equal to the total is reported
/// once, by [`finish`](Self::finish), however the transfer was chunked.
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    total: u64,
    current: AtomicU64,
    finished: AtomicBool,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    pub fn new(total: u64, callback: Option<ProgressCallback>) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                total,
                current: AtomicU64::new(0),
                finished: AtomicBool::new(false),
                callback,
            }),
        }
    }

    pub fn total(&self) -> u64 {
        self.inner.total
    }

    pub fn current(&self) -> u64 {
        self.inner.current.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::Acquire)
    }

    /// Count `n` bytes and report the new position.
    ///
    /// Zero-byte transfers are not reported, nor is a position at or past the
    /// total; that one belongs to [`finish`](Self::finish).
    pub fn advance(&self, n: u64) {
        if n == 0 {
            return;
        }
        let now = self.inner.current.fetch_add(n, Ordering::AcqRel) + n;
        if now < self.inner.total {
            self.emit(now);
        }
    }

    /// Count `n` bytes that were already in place (resumed parts) without
    /// reporting. The next reported position includes them.
    pub fn skip(&self, n: u64) {
        self.inner.current.fetch_add(n, Ordering::AcqRel);
    }

    /// Report `total` once. Later calls are no-ops.
    pub fn finish(&self) {
        if self.inner.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.current.store(self.inner.total, Ordering::Release);
        self.emit(self.inner.total);
    }

    fn emit(&self, bytes: u64) {
        if let Some(cb) = &self.inner.callback {
            cb(bytes, self.inner.total);
        }
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("total", &self.total())
            .field("current", &self.current())
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Reader that reports every successful read to a tracker
pub struct ProgressReader<R> {
    inner: R,
    tracker: ProgressTracker,
}

impl<R> ProgressReader<R> {
    pub fn new(inner: R, tracker: ProgressTracker) -> Self {
        Self { inner, tracker }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let this = &mut *self;
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;
        let n = buf.filled().len() - before;
        this.tracker.advance(n as u64);
        Poll::Ready(Ok(()))
    }
}

/// Writer that reports every successful write to a tracker
pub struct ProgressWriter<W> {
    inner: W,
    tracker: ProgressTracker,
}

impl<W> ProgressWriter<W> {
    pub fn new(inner: W, tracker: ProgressTracker) -> Self {
        Self { inner, tracker }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for ProgressWriter<W> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        let n = ready!(Pin::new(&mut this.inner).poll_write(cx, buf))?;
        this.tracker.advance(n as u64);
        Poll::Ready(Ok(n))
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<(u64, u64)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let cb: ProgressCallback = Arc::new(move |done, total| s.lock().push((done, total)));
        (cb, seen)
    }

    #[test]
    fn test_total_reported_once() {
        let (cb, seen) = recorder();
        let tracker = ProgressTracker::new(10, Some(cb));

        tracker.advance(4);
        tracker.advance(0);
        tracker.advance(6);
        tracker.finish();
        tracker.finish();

        assert_eq!(*seen.lock(), vec![(4, 10), (10, 10)]);
        assert!(tracker.is_finished());
    }

    #[test]
    fn test_skip_is_silent_but_counted() {
        let (cb, seen) = recorder();
        let tracker = ProgressTracker::new(100, Some(cb));

        tracker.skip(60);
        tracker.advance(10);
        tracker.finish();

        assert_eq!(*seen.lock(), vec![(70, 100), (100, 100)]);
    }

    #[test]
    fn test_empty_total() {
        let (cb, seen) = recorder();
        let tracker = ProgressTracker::new(0, Some(cb));
        tracker.finish();
        assert_eq!(*seen.lock(), vec![(0, 0)]);
    }

    #[tokio::test]
    async fn test_reader_reports_reads() {
        let (cb, seen) = recorder();
        let tracker = ProgressTracker::new(10, Some(cb));
        let data: &[u8] = b"0123456789";
        let mut reader = ProgressReader::new(data, tracker.clone());

        let mut buf = [0u8; 3];
        while reader.read(&mut buf).await.unwrap() > 0 {}
        tracker.finish();

        let seen = seen.lock();
        assert_eq!(seen.first(), Some(&(3, 10)));
        assert_eq!(seen.last(), Some(&(10, 10)));
        assert_eq!(seen.iter().filter(|(d, _)| *d == 10).count(), 1);
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[tokio::test]
    async fn test_writer_reports_writes() {
        let tracker = ProgressTracker::new(5, None);
        let mut writer = ProgressWriter::new(Vec::new(), tracker.clone());
        writer.write_all(b"hello").await.unwrap();
        writer.flush().await.unwrap();

        assert_eq!(tracker.current(), 5);
        assert_eq!(writer.into_inner(), b"hello");
    }
}
