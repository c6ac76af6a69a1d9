//! Part types for multipart sessions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open byte range `[offset, offset + length)` of the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub offset: u64,
    pub length: u64,
}

impl ByteRange {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.offset, self.end())
    }
}

/// Opaque per-part token (an ETag on S3) required to finalize a session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntegrityTag(String);

impl IntegrityTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IntegrityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A part the store reports as already committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedPart {
    pub part_number: u32,
    pub size: u64,
    pub tag: IntegrityTag,
}

/// One page of a committed-parts listing
#[derive(Debug, Clone, Default)]
pub struct PartPage {
    pub parts: Vec<CommittedPart>,
    /// Part number marker to continue from, `None` when the listing is done
    pub next_cursor: Option<u32>,
}

/// A part placed in the source, committed or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartDescriptor {
    pub part_number: u32,
    pub range: ByteRange,
    pub tag: Option<IntegrityTag>,
    pub committed: bool,
}

impl PartDescriptor {
    pub fn pending(part_number: u32, range: ByteRange) -> Self {
        Self {
            part_number,
            range,
            tag: None,
            committed: false,
        }
    }

    pub fn committed(part_number: u32, range: ByteRange, tag: IntegrityTag) -> Self {
        Self {
            part_number,
            range,
            tag: Some(tag),
            committed: true,
        }
    }

    /// The `(part_number, tag)` pair used to finalize, if committed
    pub fn completed(&self) -> Option<CompletedPart> {
        match (&self.tag, self.committed) {
            (Some(tag), true) => Some(CompletedPart {
                part_number: self.part_number,
                tag: tag.clone(),
            }),
            _ => None,
        }
    }
}

/// Finalize input: one entry per part, in ascending part order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    pub part_number: u32,
    pub tag: IntegrityTag,
}

/// Fixed-size split of `total_size` bytes; the last part holds the remainder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartPlan {
    pub total_size: u64,
    pub part_size: u64,
}

impl PartPlan {
    pub fn new(total_size: u64, part_size: u64) -> Self {
        Self {
            total_size,
            part_size,
        }
    }

    /// Number of parts, `None` when it does not fit a part number
    pub fn part_count(&self) -> Option<u32> {
        if self.part_size == 0 {
            return Some(0);
        }
        u32::try_from(self.total_size.div_ceil(self.part_size)).ok()
    }

    /// Range of part `part_number` (1-based), `None` past the end of the source
    pub fn range_of(&self, part_number: u32) -> Option<ByteRange> {
        if part_number == 0 || self.part_size == 0 {
            return None;
        }
        let offset = (part_number as u64 - 1) * self.part_size;
        if offset >= self.total_size {
            return None;
        }
        let length = self.part_size.min(self.total_size - offset);
        Some(ByteRange::new(offset, length))
    }

    /// Pending descriptors for every part. Empty if the count overflows.
    pub fn iter(&self) -> impl Iterator<Item = PartDescriptor> + '_ {
        (1..=self.part_count().unwrap_or(0))
            .filter_map(move |n| self.range_of(n).map(|r| PartDescriptor::pending(n, r)))
    }
}
