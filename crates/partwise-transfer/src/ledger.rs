//! Part ledger: the committed parts of one session, read from the store

use std::collections::BTreeMap;

use partwise_core::types::{
    ByteRange, CommittedPart, PartDescriptor, PartPlan, SessionHandle,
};
use partwise_core::{Error, Result, StoreOp};
use partwise_store::ObjectStore;
use tracing::debug;

/// Fetch every committed part of `session`, in part order.
///
/// Pages until the store reports no further cursor. A cursor that fails to
/// move forward is a store error rather than an endless loop.
pub async fn list_committed_parts(
    store: &dyn ObjectStore,
    session: &SessionHandle,
) -> Result<Vec<CommittedPart>> {
    let mut parts = Vec::new();
    let mut cursor: Option<u32> = None;
    let mut pages = 0usize;

    loop {
        let page = store.list_committed_parts(session, cursor).await?;
        pages += 1;
        parts.extend(page.parts);

        match page.next_cursor {
            None => break,
            Some(next) if cursor.map_or(false, |c| next <= c) => {
                return Err(Error::store(
                    StoreOp::ListParts,
                    format!("Part listing cursor did not advance past {}", next),
                ));
            }
            Some(next) => cursor = Some(next),
        }
    }

    parts.sort_by_key(|p| p.part_number);
    parts.dedup_by_key(|p| p.part_number);
    debug!(session = %session, parts = parts.len(), pages, "Fetched part ledger");
    Ok(parts)
}

/// Committed parts keyed by part number
#[derive(Debug, Clone, Default)]
pub struct PartLedger {
    parts: BTreeMap<u32, CommittedPart>,
}

impl PartLedger {
    /// Read the ledger fresh from the store
    pub async fn fetch(store: &dyn ObjectStore, session: &SessionHandle) -> Result<Self> {
        let parts = list_committed_parts(store, session).await?;
        Ok(Self::from_parts(parts))
    }

    pub fn from_parts(parts: impl IntoIterator<Item = CommittedPart>) -> Self {
        Self {
            parts: parts.into_iter().map(|p| (p.part_number, p)).collect(),
        }
    }

    pub fn get(&self, part_number: u32) -> Option<&CommittedPart> {
        self.parts.get(&part_number)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn committed_bytes(&self) -> u64 {
        self.parts.values().map(|p| p.size).sum()
    }

    /// Largest committed part, which is the nominal part size of the session
    /// once any non-final part is committed
    pub fn part_size_hint(&self) -> Option<u64> {
        self.parts.values().map(|p| p.size).max()
    }

    /// Check committed parts against the layout `plan` would produce.
    ///
    /// Returns the first part whose recorded size differs from the length
    /// the plan gives it. A part shorter than the plan's part size is only
    /// accepted behind a full run of committed parts `1..n`, since parts are
    /// uploaded in order and a short part is always the last one; a lone
    /// short part may sit at a different offset. Parts past the end of the
    /// source are not checked.
    pub fn check_plan(&self, plan: &PartPlan) -> Result<()> {
        for part in self.parts.values() {
            let Some(range) = plan.range_of(part.part_number) else {
                continue;
            };
            if part.size != range.length {
                return Err(Error::PartSizeMismatch {
                    part_number: part.part_number,
                    expected: range.length,
                    found: part.size,
                });
            }
            if part.size < plan.part_size
                && (1..part.part_number).any(|n| !self.parts.contains_key(&n))
            {
                return Err(Error::PartSizeMismatch {
                    part_number: part.part_number,
                    expected: plan.part_size,
                    found: part.size,
                });
            }
        }
        Ok(())
    }

    /// Committed part numbers that lie past the end of the source
    pub fn beyond(&self, plan: &PartPlan) -> Vec<u32> {
        self.parts
            .keys()
            .copied()
            .filter(|n| plan.range_of(*n).is_none())
            .collect()
    }

    /// Descriptors for the source laid out by `plan`, committed or pending
    pub fn descriptors(&self, plan: &PartPlan) -> Vec<PartDescriptor> {
        plan.iter()
            .map(|pending| match self.get(pending.part_number) {
                Some(part) => PartDescriptor::committed(
                    part.part_number,
                    ByteRange::new(pending.range.offset, part.size),
                    part.tag.clone(),
                ),
                None => pending,
            })
            .collect()
    }
}
