//! Partwise Transfer
//!
//! Resumable chunked uploads and streaming downloads over an
//! [`ObjectStore`](partwise_store::ObjectStore).
//!
//! - [`UploadCoordinator`]: splits a file into parts, skips the parts an open
//!   session already holds and finalizes when every part is accounted for
//! - [`DownloadStreamer`]: copies an object stream into a local file
//! - [`PartLedger`]: the committed parts of a session, read from the store
//! - [`ProgressTracker`]: byte counting with a caller-supplied callback
//!
//! [`TransferEngine`] ties these together behind one handle.

pub mod download;
pub mod engine;
pub mod ledger;
pub mod metrics;
pub mod progress;
pub mod upload;

pub use download::DownloadStreamer;
pub use engine::{TransferEngine, TransferOptions};
pub use ledger::{list_committed_parts, PartLedger};
pub use progress::{ProgressCallback, ProgressReader, ProgressTracker, ProgressWriter};
pub use upload::{verify_complete, UploadCoordinator};
