use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{AssertionKey, CoverageAssertion};

/// An assertion together with the version of its key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VersionedAssertion {
    pub version: u32,
    pub assertion: CoverageAssertion,
}

/// Result of [`AssertionBook::upsert`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Replaced { version: u32 },
    /// Identical payload re-submitted; the stored version is kept.
    Unchanged { version: u32 },
}

/// Current coverage assertions, one per [`AssertionKey`].
///
/// A stored version is never mutated in place: a differing payload for the
/// same key replaces it wholesale and bumps the version.
#[derive(Clone, Debug, Default)]
pub struct AssertionBook {
    entries: BTreeMap<AssertionKey, VersionedAssertion>,
}

impl AssertionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, assertion: CoverageAssertion) -> UpsertOutcome {
        let key = assertion.key();
        match self.entries.get_mut(&key) {
            None => {
                self.entries.insert(
                    key,
                    VersionedAssertion {
                        version: 1,
                        assertion,
                    },
                );
                UpsertOutcome::Inserted
            }
            Some(existing) if existing.assertion == assertion => UpsertOutcome::Unchanged {
                version: existing.version,
            },
            Some(existing) => {
                existing.version += 1;
                existing.assertion = assertion;
                UpsertOutcome::Replaced {
                    version: existing.version,
                }
            }
        }
    }

    pub fn get(&self, key: &AssertionKey) -> Option<&VersionedAssertion> {
        self.entries.get(key)
    }

    /// All current assertions for one (payer, test) pair, in key order.
    pub fn for_pair(&self, payer_id: &str, test_id: &str) -> Vec<CoverageAssertion> {
        self.entries
            .iter()
            .filter(|(k, _)| k.payer_id == payer_id && k.test_id == test_id)
            .map(|(_, v)| v.assertion.clone())
            .collect()
    }

    /// Distinct (payer, test) pairs with at least one assertion.
    pub fn pairs(&self) -> BTreeSet<(String, String)> {
        self.entries
            .keys()
            .map(|k| (k.payer_id.clone(), k.test_id.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
