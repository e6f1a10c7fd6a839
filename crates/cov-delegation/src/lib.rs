//! cov-delegation
//!
//! Delegation registry and evidence gate.
//!
//! Tracks, per payer, whether lab-benefit management is handed to a Lab
//! Benefit Manager (LBM). Two axes are kept apart:
//!
//! - **evidence** (suspected / confirmed): how sure we are the handoff exists.
//!   Confirmation needs manual verification, a high-confidence detection, or
//!   two corroborating detections. It decays back to suspected once nothing
//!   has verified it inside the decay window.
//! - **effectiveness** (pending / effective / expired): a pure function of the
//!   record's dates and the caller-supplied `today`.
//!
//! The output is routing metadata for the reconciliation engine. Nothing in
//! this crate answers "covered" or "denied".
//!
//! No wall-clock reads: callers pass `today`.

mod axes;
mod registry;
mod store;
mod types;

pub use axes::{effectiveness_on, legacy_status, resolve_evidence, EvidencePolicy, EvidenceResolution};
pub use registry::{routing_from_status, DelegationRegistry};
pub use store::{
    DelegationStore, DetectedEvidence, InMemoryDelegationStore, MAX_DETECTIONS_PER_PAYER,
};
pub use types::*;
