//! cov-schemas
//!
//! Wire data model shared by the change detector, the delegation gate and the
//! reconciliation engine.
//!
//! Every type here is produced by an untrusted collaborator (crawler,
//! extractor, pattern detector). Deserialization is therefore lenient: a
//! missing, `null` or wrong-typed field decays to its default (unclear status,
//! zero confidence, empty list) instead of failing the whole payload, and
//! unrecognized enum strings are preserved in an `Unknown` variant.

mod assertion;
mod book;
mod extracted;
pub mod lenient;

pub use assertion::{AssertionKey, AssertionStatus, CoverageAssertion, Layer};
pub use book::{AssertionBook, UpsertOutcome, VersionedAssertion};
pub use extracted::{BillingCodes, ExtractedFields};
