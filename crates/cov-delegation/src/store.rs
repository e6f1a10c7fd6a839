use std::collections::BTreeMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::DelegationDetection;

/// Per-payer ceiling on retained detections; the oldest go first.
pub const MAX_DETECTIONS_PER_PAYER: usize = 64;

/// Everything the crawler has detected for one payer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectedEvidence {
    pub detections: Vec<DelegationDetection>,
}

impl DetectedEvidence {
    /// Add `detection`, then drop detections dated more than `retain_days`
    /// before the newest one on file and cap the list at
    /// [`MAX_DETECTIONS_PER_PAYER`].
    pub fn push_pruned(&mut self, detection: DelegationDetection, retain_days: i64) {
        self.detections.push(detection);
        let Some(newest) = self.detections.iter().map(|d| d.detected_at.date_naive()).max() else {
            return;
        };
        self.detections
            .retain(|d| (newest - d.detected_at.date_naive()).num_days() <= retain_days);

        if self.detections.len() > MAX_DETECTIONS_PER_PAYER {
            self.detections.sort_by_key(|d| d.detected_at);
            let excess = self.detections.len() - MAX_DETECTIONS_PER_PAYER;
            self.detections.drain(..excess);
        }
    }
}

/// Detected-evidence store: written rarely by the crawl loop, read on every
/// gate query. The only shared mutable state in the engine.
pub trait DelegationStore: Send + Sync {
    fn get(&self, payer_id: &str) -> Option<DetectedEvidence>;
    fn put(&self, payer_id: &str, evidence: DetectedEvidence);

    /// Record one more detection and prune what can no longer count (see
    /// [`DetectedEvidence::push_pruned`]). The default is read-modify-write
    /// and assumes a single writer; implementations may make it atomic.
    fn append(&self, payer_id: &str, detection: DelegationDetection, retain_days: i64) {
        let mut ev = self.get(payer_id).unwrap_or_default();
        ev.push_pruned(detection, retain_days);
        self.put(payer_id, ev);
    }
}

/// `RwLock`-backed [`DelegationStore`].
#[derive(Debug, Default)]
pub struct InMemoryDelegationStore {
    inner: RwLock<BTreeMap<String, DetectedEvidence>>,
}

impl InMemoryDelegationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DelegationStore for InMemoryDelegationStore {
    fn get(&self, payer_id: &str) -> Option<DetectedEvidence> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(payer_id)
            .cloned()
    }

    fn put(&self, payer_id: &str, evidence: DetectedEvidence) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(payer_id.to_string(), evidence);
    }

    fn append(&self, payer_id: &str, detection: DelegationDetection, retain_days: i64) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(payer_id.to_string())
            .or_default()
            .push_pruned(detection, retain_days);
    }
}
