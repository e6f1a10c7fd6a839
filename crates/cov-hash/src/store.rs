use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use cov_schemas::ExtractedFields;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::compare::{compare_multi_hash, Comparison};
use crate::compute::MultiHashSnapshot;

/// Latest-snapshot persistence seam. One snapshot per document id.
///
/// `upsert` must be atomic per id: recomputing after a crash between compute
/// and store then yields the same comparison again.
pub trait SnapshotStore: Send + Sync {
    fn latest(&self, policy_id: &str) -> Option<MultiHashSnapshot>;
    fn upsert(&self, snapshot: MultiHashSnapshot);
}

/// Process-local [`SnapshotStore`].
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    inner: RwLock<BTreeMap<String, MultiHashSnapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn latest(&self, policy_id: &str) -> Option<MultiHashSnapshot> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(policy_id)
            .cloned()
    }

    fn upsert(&self, snapshot: MultiHashSnapshot) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(snapshot.policy_id.clone(), snapshot);
    }
}

/// Snapshot just stored plus how it compares to its predecessor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeReport {
    pub snapshot: MultiHashSnapshot,
    pub comparison: Comparison,
}

/// Compute, compare against the stored snapshot, then upsert.
pub fn detect_change(
    store: &dyn SnapshotStore,
    policy_id: &str,
    content: Option<&str>,
    extracted: Option<&ExtractedFields>,
    parser_version: Option<&str>,
    now: DateTime<Utc>,
) -> ChangeReport {
    let prior = store.latest(policy_id);
    let snapshot = MultiHashSnapshot::compute(policy_id, content, extracted, parser_version, now);
    let comparison = compare_multi_hash(prior.as_ref(), &snapshot);

    if comparison.possible_system_change {
        warn!(
            policy_id,
            notes = ?comparison.notes,
            "possible extraction regression; document content unchanged"
        );
    } else {
        debug!(
            policy_id,
            priority = %comparison.priority,
            changed = ?comparison.changed_hashes,
            "multi-hash compared"
        );
    }

    store.upsert(snapshot.clone());
    ChangeReport {
        snapshot,
        comparison,
    }
}
