//! Point-in-time scope snapshots with a canonical checksum.

use crate::rule::RuleCategory;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// A program's scope at one moment: deduplicated in/out sets plus a checksum
/// derived from them.
///
/// The checksum is SHA-256 over the canonical JSON
/// `{"in_scope":[..sorted..],"out_of_scope":[..sorted..]}`, so it is invariant
/// to input order and duplicate entries. It is always recomputed, including
/// on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SnapshotRepr", into = "SnapshotRepr")]
pub struct ScopeSnapshot {
    in_scope: BTreeSet<String>,
    out_of_scope: BTreeSet<String>,
    checksum: String,
}

#[derive(Serialize, Deserialize)]
struct SnapshotRepr {
    #[serde(default)]
    in_scope: Vec<String>,
    #[serde(default)]
    out_of_scope: Vec<String>,
}

#[derive(Serialize)]
struct CanonicalScope<'a> {
    in_scope: &'a BTreeSet<String>,
    out_of_scope: &'a BTreeSet<String>,
}

impl ScopeSnapshot {
    /// Build a snapshot from raw in/out lists.
    pub fn new<I, O, S, T>(in_scope: I, out_of_scope: O) -> Self
    where
        I: IntoIterator<Item = S>,
        O: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        let in_scope: BTreeSet<String> = in_scope.into_iter().map(Into::into).collect();
        let out_of_scope: BTreeSet<String> = out_of_scope.into_iter().map(Into::into).collect();
        let checksum = checksum(&in_scope, &out_of_scope);

        Self {
            in_scope,
            out_of_scope,
            checksum,
        }
    }

    /// Snapshot with no rules at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::<String>::new(), Vec::<String>::new())
    }

    /// In-scope entries, sorted.
    #[must_use]
    pub fn in_scope(&self) -> &BTreeSet<String> {
        &self.in_scope
    }

    /// Out-of-scope entries, sorted.
    #[must_use]
    pub fn out_of_scope(&self) -> &BTreeSet<String> {
        &self.out_of_scope
    }

    /// Hex SHA-256 of the canonical content.
    #[must_use]
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Short checksum prefix for log lines.
    #[must_use]
    pub fn short_checksum(&self) -> &str {
        &self.checksum[..8]
    }

    /// Entries of one category.
    #[must_use]
    pub fn items(&self, category: RuleCategory) -> &BTreeSet<String> {
        match category {
            RuleCategory::InScope => &self.in_scope,
            RuleCategory::OutOfScope => &self.out_of_scope,
        }
    }

    /// Total number of entries across both categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.in_scope.len() + self.out_of_scope.len()
    }

    /// Whether the snapshot has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<SnapshotRepr> for ScopeSnapshot {
    fn from(repr: SnapshotRepr) -> Self {
        Self::new(repr.in_scope, repr.out_of_scope)
    }
}

impl From<ScopeSnapshot> for SnapshotRepr {
    fn from(snapshot: ScopeSnapshot) -> Self {
        Self {
            in_scope: snapshot.in_scope.into_iter().collect(),
            out_of_scope: snapshot.out_of_scope.into_iter().collect(),
        }
    }
}

fn checksum(in_scope: &BTreeSet<String>, out_of_scope: &BTreeSet<String>) -> String {
    let canonical = serde_json::to_string(&CanonicalScope {
        in_scope,
        out_of_scope,
    })
    .expect("sets of strings always serialize to JSON");

    hex::encode(Sha256::digest(canonical.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_invariant_to_order_and_duplicates() {
        let a = ScopeSnapshot::new(["a", "b"], Vec::<String>::new());
        let b = ScopeSnapshot::new(["b", "a", "b"], Vec::<String>::new());
        assert_eq!(a.checksum(), b.checksum());
        assert_eq!(a, b);
    }

    #[test]
    fn test_checksum_distinguishes_categories() {
        let a = ScopeSnapshot::new(["x.com"], Vec::<String>::new());
        let b = ScopeSnapshot::new(Vec::<String>::new(), ["x.com"]);
        assert_ne!(a.checksum(), b.checksum());
    }

    #[test]
    fn test_checksum_is_hex_sha256() {
        let snapshot = ScopeSnapshot::empty();
        assert_eq!(snapshot.checksum().len(), 64);
        assert!(snapshot.checksum().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(snapshot.short_checksum().len(), 8);
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_deserialize_recomputes_checksum() {
        let json = r#"{"in_scope":["b.com","a.com","a.com"],"checksum":"bogus"}"#;
        let snapshot: ScopeSnapshot = serde_json::from_str(json).expect("deserialize snapshot");

        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            snapshot.checksum(),
            ScopeSnapshot::new(["a.com", "b.com"], Vec::<String>::new()).checksum()
        );

        let round_trip = serde_json::to_string(&snapshot).expect("serialize snapshot");
        assert_eq!(round_trip, r#"{"in_scope":["a.com","b.com"],"out_of_scope":[]}"#);
    }

    #[test]
    fn test_items_by_category() {
        let snapshot = ScopeSnapshot::new(["*.acme.com"], ["admin.acme.com"]);
        assert!(snapshot.items(RuleCategory::InScope).contains("*.acme.com"));
        assert!(snapshot
            .items(RuleCategory::OutOfScope)
            .contains("admin.acme.com"));
    }
}
