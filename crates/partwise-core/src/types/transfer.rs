//! Transfer results

use serde::{Serialize, Serializer};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    Upload,
    Download,
}

/// What one `upload`/`download` call did
#[derive(Debug, Clone, Serialize)]
pub struct TransferSummary {
    pub direction: TransferDirection,
    pub bucket: String,
    pub key: String,
    /// Size of the whole object
    pub total_bytes: u64,
    /// Bytes moved by this call (excludes parts committed earlier)
    pub bytes_transferred: u64,
    pub parts_uploaded: u32,
    pub parts_skipped: u32,
    /// True when an existing session was continued
    pub resumed: bool,
    pub etag: Option<String>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl TransferSummary {
    pub fn new(direction: TransferDirection, bucket: &str, key: &str, total_bytes: u64) -> Self {
        Self {
            direction,
            bucket: bucket.to_string(),
            key: key.to_string(),
            total_bytes,
            bytes_transferred: 0,
            parts_uploaded: 0,
            parts_skipped: 0,
            resumed: false,
            etag: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Average throughput of this call in bytes per second
    pub fn bytes_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.bytes_transferred as f64 / secs
    }
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_json() {
        let mut summary = TransferSummary::new(TransferDirection::Upload, "b", "k", 10);
        summary.bytes_transferred = 10;
        summary.elapsed = Duration::from_millis(1500);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["direction"], "upload");
        assert_eq!(json["elapsed_ms"], 1500);
        assert!(summary.bytes_per_second() > 6.0);
    }
}
