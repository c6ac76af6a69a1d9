//! Partwise Core Library
//!
//! Core types, configuration and errors shared by the partwise transfer
//! engine, its store backends and the command-line client.

pub mod config;
pub mod error;
pub mod types;

pub use config::{PartSizeConflict, TransferConfig};
pub use error::{Error, Result, StoreOp};

/// Partwise version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum number of parts in a multipart session
pub const MAX_PARTS: u32 = 10_000;

/// Minimum part size accepted by S3-compatible stores (5 MiB)
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Default part size (40 MiB)
pub const DEFAULT_PART_SIZE: u64 = 40 * 1024 * 1024;

/// Default copy buffer for streaming reads and writes (64 KiB)
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;
