//! Error types for partwise

use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The store call that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    FindSession,
    OpenSession,
    ListParts,
    UploadPart(u32),
    CompleteSession,
    AbortSession,
    PutObject,
    ObjectMetadata,
    OpenStream,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOp::FindSession => f.write_str("find open session"),
            StoreOp::OpenSession => f.write_str("open session"),
            StoreOp::ListParts => f.write_str("list committed parts"),
            StoreOp::UploadPart(n) => write!(f, "upload part {}", n),
            StoreOp::CompleteSession => f.write_str("complete session"),
            StoreOp::AbortSession => f.write_str("abort session"),
            StoreOp::PutObject => f.write_str("put object"),
            StoreOp::ObjectMetadata => f.write_str("fetch object metadata"),
            StoreOp::OpenStream => f.write_str("open object stream"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    // Local Errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to read part {part_number} from source: {source}")]
    SourceRead {
        part_number: u32,
        #[source]
        source: std::io::Error,
    },

    // Remote Errors
    #[error("Store rejected {op}: {message}")]
    Store { op: StoreOp, message: String },

    // Consistency Errors
    #[error(
        "Upload incomplete: expected {expected} parts, recorded {recorded} (missing {missing:?})"
    )]
    IncompleteTransfer {
        expected: u32,
        recorded: u32,
        missing: Vec<u32>,
    },

    #[error("Part {part_number} was committed with {found} bytes, expected {expected}")]
    PartSizeMismatch {
        part_number: u32,
        expected: u64,
        found: u64,
    },

    // Caller Errors
    #[error("Transfer cancelled")]
    Cancelled,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build a store error from anything displayable
    pub fn store(op: StoreOp, message: impl fmt::Display) -> Self {
        Error::Store {
            op,
            message: message.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Error::Io(_) | Error::SourceRead { .. } => "IOError",
            Error::Store { .. } => "StoreError",
            Error::IncompleteTransfer { .. } => "IncompleteTransferError",
            Error::PartSizeMismatch { .. } => "PartSizeMismatch",
            Error::Cancelled => "CancelledError",
            Error::InvalidArgument(_) => "InvalidArgument",
            Error::Config(_) => "ConfigError",
        }
    }

    /// Whether repeating the whole call can make progress.
    ///
    /// Sessions survive store and cancellation failures, so a later call
    /// resumes from the committed parts. Local I/O failures need the caller
    /// to fix the file first.
    pub fn is_resumable(&self) -> bool {
        matches!(self, Error::Store { .. } | Error::Cancelled)
    }

    /// Part number this error refers to, if any
    pub fn part_number(&self) -> Option<u32> {
        match self {
            Error::Store {
                op: StoreOp::UploadPart(n),
                ..
            } => Some(*n),
            Error::PartSizeMismatch { part_number, .. } => Some(*part_number),
            Error::SourceRead { part_number, .. } => Some(*part_number),
            _ => None,
        }
    }
}
