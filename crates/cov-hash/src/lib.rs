//! cov-hash
//!
//! Multi-hash change detector for payer policy documents.
//!
//! A document is fingerprinted along four independent axes (full text,
//! metadata, coverage criteria, billing codes). Comparing against the prior
//! snapshot classifies how urgent a re-extraction is and flags likely parser
//! drift. Every slot is independently nullable: a missing input yields `None`
//! for that slot, never an error.
//!
//! Pure deterministic logic apart from the optional [`SnapshotStore`] seam.

mod canonical;
mod compare;
mod compute;
mod section;
mod store;

pub use canonical::{canonical_json, canonicalize_text, sha256_hex};
pub use compare::{compare_multi_hash, should_analyze, ChangePriority, Comparison, HashKind};
pub use compute::{compute_multi_hash, MultiHash, MultiHashSnapshot};
pub use section::slice_criteria_section;
pub use store::{detect_change, ChangeReport, InMemorySnapshotStore, SnapshotStore};
