use serde::{Deserialize, Serialize};

use crate::compute::MultiHashSnapshot;

/// How urgently a document needs re-extraction.
///
/// Ordered: `None < Low < Medium < High`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangePriority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl ChangePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangePriority::None => "none",
            ChangePriority::Low => "low",
            ChangePriority::Medium => "medium",
            ChangePriority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Some(ChangePriority::None),
            "low" => Some(ChangePriority::Low),
            "medium" => Some(ChangePriority::Medium),
            "high" => Some(ChangePriority::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChangePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which fingerprint moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashKind {
    Content,
    Metadata,
    Criteria,
    Codes,
    NewDocument,
}

/// Outcome of comparing a fresh snapshot against the prior one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub changed: bool,
    pub priority: ChangePriority,
    pub changed_hashes: Vec<HashKind>,
    /// Soft warning: the extraction side moved while the document did not.
    /// Surfaced for audit; never blocks.
    pub possible_system_change: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Compare two snapshots of the same document.
///
/// A missing prior snapshot is always a high-priority change.
pub fn compare_multi_hash(old: Option<&MultiHashSnapshot>, new: &MultiHashSnapshot) -> Comparison {
    let Some(old) = old else {
        return Comparison {
            changed: true,
            priority: ChangePriority::High,
            changed_hashes: vec![HashKind::NewDocument],
            possible_system_change: false,
            notes: Vec::new(),
        };
    };

    let (o, n) = (&old.hashes, &new.hashes);
    let mut changed_hashes = Vec::new();
    if o.content_hash != n.content_hash {
        changed_hashes.push(HashKind::Content);
    }
    if o.metadata_hash != n.metadata_hash {
        changed_hashes.push(HashKind::Metadata);
    }
    if o.criteria_hash != n.criteria_hash {
        changed_hashes.push(HashKind::Criteria);
    }
    if o.codes_hash != n.codes_hash {
        changed_hashes.push(HashKind::Codes);
    }

    let priority = priority_for(&changed_hashes);

    let mut notes = Vec::new();
    let content_same = o.content_hash == n.content_hash;
    if content_same && o.criteria_hash != n.criteria_hash {
        notes.push("criteria hash moved while content hash did not".to_string());
    }
    if old.parser_version != new.parser_version {
        notes.push(format!(
            "parser version changed: {} -> {}",
            old.parser_version.as_deref().unwrap_or("unset"),
            new.parser_version.as_deref().unwrap_or("unset")
        ));
    }

    Comparison {
        changed: !changed_hashes.is_empty(),
        priority,
        changed_hashes,
        possible_system_change: !notes.is_empty(),
        notes,
    }
}

/// Priority is the highest tier any changed slot maps to.
fn priority_for(changed: &[HashKind]) -> ChangePriority {
    changed
        .iter()
        .map(|k| match k {
            HashKind::Criteria | HashKind::Codes | HashKind::NewDocument => ChangePriority::High,
            HashKind::Metadata => ChangePriority::Medium,
            HashKind::Content => ChangePriority::Low,
        })
        .max()
        .unwrap_or(ChangePriority::None)
}

/// Gate for the expensive downstream extraction step.
pub fn should_analyze(comparison: &Comparison, min_priority: ChangePriority) -> bool {
    comparison.priority >= min_priority
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_is_max_of_changed_tiers() {
        assert_eq!(priority_for(&[]), ChangePriority::None);
        assert_eq!(priority_for(&[HashKind::Content]), ChangePriority::Low);
        assert_eq!(
            priority_for(&[HashKind::Content, HashKind::Metadata]),
            ChangePriority::Medium
        );
        assert_eq!(
            priority_for(&[HashKind::Metadata, HashKind::Codes]),
            ChangePriority::High
        );
    }

    #[test]
    fn priority_scale_is_ordered() {
        assert!(ChangePriority::None < ChangePriority::Low);
        assert!(ChangePriority::Low < ChangePriority::Medium);
        assert!(ChangePriority::Medium < ChangePriority::High);
        assert_eq!(ChangePriority::parse("MEDIUM"), Some(ChangePriority::Medium));
        assert_eq!(ChangePriority::parse("urgent"), None);
    }
}
