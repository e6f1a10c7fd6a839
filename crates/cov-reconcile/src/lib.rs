//! cov-reconcile
//!
//! Coverage reconciliation engine.
//!
//! Merges every coverage assertion for one (payer, test) pair into a single
//! decision:
//! - Rank by authority layer weight, then assertion confidence. Never recency.
//! - Delegation routing reweights LBM guideline vs payer policy stance; it
//!   never removes an assertion and never votes on coverage itself.
//! - A direct contradiction (supports vs denies) is never auto-resolved: the
//!   result is `conflict_review_required` and a human must decide.
//!
//! Deterministic, pure logic. No IO.

mod engine;
mod gate;
mod summary;
mod types;
mod weights;

pub use engine::{conflict_severity, reconcile, reconcile_with_registry};
pub use gate::{check_publish_gate, PublishGate};
pub use summary::{frontend_status, summarize, CoverageSummary, FrontendCoverage, FrontendStatus, ReviewItem};
pub use types::*;
pub use weights::LayerWeights;
