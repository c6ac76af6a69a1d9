//! Transfer counters
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! host installs a recorder.

use metrics::{counter, histogram};
use partwise_core::types::TransferDirection;

/// Metric names
pub mod names {
    pub const PARTS_UPLOADED_TOTAL: &str = "partwise_parts_uploaded_total";
    pub const PARTS_SKIPPED_TOTAL: &str = "partwise_parts_skipped_total";
    pub const BYTES_UPLOADED_TOTAL: &str = "partwise_bytes_uploaded_total";
    pub const BYTES_DOWNLOADED_TOTAL: &str = "partwise_bytes_downloaded_total";
    pub const TRANSFERS_TOTAL: &str = "partwise_transfers_total";
    pub const TRANSFER_DURATION_SECONDS: &str = "partwise_transfer_duration_seconds";
}

fn direction_label(direction: TransferDirection) -> &'static str {
    match direction {
        TransferDirection::Upload => "upload",
        TransferDirection::Download => "download",
    }
}

pub(crate) fn record_part_uploaded(bytes: u64) {
    counter!(names::PARTS_UPLOADED_TOTAL).increment(1);
    counter!(names::BYTES_UPLOADED_TOTAL).increment(bytes);
}

pub(crate) fn record_part_skipped() {
    counter!(names::PARTS_SKIPPED_TOTAL).increment(1);
}

pub(crate) fn record_bytes_uploaded(bytes: u64) {
    counter!(names::BYTES_UPLOADED_TOTAL).increment(bytes);
}

pub(crate) fn record_bytes_downloaded(bytes: u64) {
    counter!(names::BYTES_DOWNLOADED_TOTAL).increment(bytes);
}

/// Record the outcome of one upload/download call
pub(crate) fn record_transfer(direction: TransferDirection, success: bool, duration_secs: f64) {
    let direction = direction_label(direction);

    counter!(
        names::TRANSFERS_TOTAL,
        "direction" => direction,
        "status" => if success { "success" } else { "error" }
    )
    .increment(1);

    histogram!(
        names::TRANSFER_DURATION_SECONDS,
        "direction" => direction
    )
    .record(duration_secs);
}
