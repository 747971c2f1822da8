//! Overlap reconciliation between consecutive pages

use crate::transform::RecordSet;

/// Result of merging a freshly fetched page into the known set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Nothing was known yet, or the fetched page overlapped as expected
    Merged(RecordSet),
    /// Overlap was present but smaller than the window, so records may
    /// have shifted between the two requests
    PartialOverlap {
        /// Merged set
        union: RecordSet,
        /// Records shared between the known set and the page
        overlap: usize,
    },
    /// The page shares nothing with the known set; a gap is possible
    Drifted,
}

impl Reconciliation {
    /// Merged set, unless the pages drifted apart
    pub fn into_union(self) -> Option<RecordSet> {
        match self {
            Self::Merged(union) | Self::PartialOverlap { union, .. } => Some(union),
            Self::Drifted => None,
        }
    }
}

/// Merge `fetched` into `known`, checking that the two overlap.
///
/// With `u = |known ∪ fetched|`:
/// - `u == |known| + |fetched|` means no shared record: drift
/// - `|known| + page_size < u < |known| + |fetched|` means a short overlap
///
/// An empty side never counts as drift.
pub fn reconcile(known: &RecordSet, fetched: &RecordSet, page_size: usize) -> Reconciliation {
    if known.is_empty() || fetched.is_empty() {
        return Reconciliation::Merged(known.union(fetched));
    }

    let union = known.union(fetched);
    let disjoint = known.len() + fetched.len();

    if union.len() == disjoint {
        return Reconciliation::Drifted;
    }

    if known.len() + page_size < union.len() {
        let overlap = disjoint - union.len();
        return Reconciliation::PartialOverlap { union, overlap };
    }

    Reconciliation::Merged(union)
}
