//! Scope snapshot comparison.
//!
//! Detects additions, removals and reclassifications between two snapshots
//! of the same program's scope. Identical checksums short-circuit the diff.

use crate::rule::RuleCategory;
use crate::snapshot::ScopeSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::info;

/// Kind of scope change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeChangeType {
    /// Item newly present in a category
    Added,
    /// Item no longer present in a category
    Removed,
    /// Item moved between in-scope and out-of-scope
    Modified,
}

impl ScopeChangeType {
    fn symbol(self) -> char {
        match self {
            Self::Added => '+',
            Self::Removed => '-',
            Self::Modified => '~',
        }
    }
}

/// A single scope change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeChange {
    /// Added, removed or modified
    pub change_type: ScopeChangeType,
    /// The raw scope entry
    pub item: String,
    /// Category the change applies to (the new category for `Modified`)
    pub category: RuleCategory,
    /// Category the item moved out of, set only for `Modified`
    pub previous_category: Option<RuleCategory>,
}

impl ScopeChange {
    fn added(item: &str, category: RuleCategory) -> Self {
        Self {
            change_type: ScopeChangeType::Added,
            item: item.to_string(),
            category,
            previous_category: None,
        }
    }

    fn removed(item: &str, category: RuleCategory) -> Self {
        Self {
            change_type: ScopeChangeType::Removed,
            item: item.to_string(),
            category,
            previous_category: None,
        }
    }

    fn moved(item: &str, from: RuleCategory, to: RuleCategory) -> Self {
        Self {
            change_type: ScopeChangeType::Modified,
            item: item.to_string(),
            category: to,
            previous_category: Some(from),
        }
    }
}

impl fmt::Display for ScopeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.change_type.symbol(),
            self.category,
            self.item
        )
    }
}

/// Result of comparing two scope snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeComparison {
    /// Items that appeared in a category
    pub additions: Vec<ScopeChange>,
    /// Items that disappeared from a category
    pub removals: Vec<ScopeChange>,
    /// Items that switched category
    pub modifications: Vec<ScopeChange>,
    /// In-scope items present in both snapshots
    pub unchanged_in_scope: BTreeSet<String>,
    /// Out-of-scope items present in both snapshots
    pub unchanged_out_scope: BTreeSet<String>,
    /// Whether anything changed
    pub has_changes: bool,
}

impl ScopeComparison {
    /// Every change: additions, then removals, then modifications.
    pub fn changes(&self) -> impl Iterator<Item = &ScopeChange> {
        self.additions
            .iter()
            .chain(&self.removals)
            .chain(&self.modifications)
    }

    /// One-line summary for notifications.
    #[must_use]
    pub fn summary(&self) -> String {
        if !self.has_changes {
            return "No scope changes detected".to_string();
        }

        let mut parts = Vec::new();
        if !self.additions.is_empty() {
            parts.push(format!("{} added", self.additions.len()));
        }
        if !self.removals.is_empty() {
            parts.push(format!("{} removed", self.removals.len()));
        }
        if !self.modifications.is_empty() {
            parts.push(format!("{} modified", self.modifications.len()));
        }
        parts.join(", ")
    }

    /// Multi-line, human-readable report grouped by change type.
    #[must_use]
    pub fn format_changes(&self) -> String {
        if !self.has_changes {
            return "No changes detected".to_string();
        }

        let mut lines = vec![self.summary(), String::new()];

        for (title, changes) in [("Additions:", &self.additions), ("Removals:", &self.removals)] {
            if changes.is_empty() {
                continue;
            }
            lines.push(title.to_string());
            lines.extend(sorted_by_item(changes).map(|c| format!("  {c}")));
            lines.push(String::new());
        }

        if !self.modifications.is_empty() {
            lines.push("Modifications:".to_string());
            for change in sorted_by_item(&self.modifications) {
                let from = change
                    .previous_category
                    .map_or("unknown", |c| c.as_str());
                lines.push(format!("  ~ {} ({from} -> {})", change.item, change.category));
            }
            lines.push(String::new());
        }

        lines.join("\n")
    }
}

fn sorted_by_item(changes: &[ScopeChange]) -> impl Iterator<Item = &ScopeChange> {
    let mut sorted: Vec<&ScopeChange> = changes.iter().collect();
    sorted.sort_by(|a, b| a.item.cmp(&b.item));
    sorted.into_iter()
}

/// Compares scope snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeComparator;

impl ScopeComparator {
    /// Create a comparator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compare `previous` against `current`.
    ///
    /// An item added to one category while removed from the other is reported
    /// once, as `Modified`, and appears in neither the additions nor the
    /// removals.
    #[must_use]
    pub fn compare(&self, previous: &ScopeSnapshot, current: &ScopeSnapshot) -> ScopeComparison {
        info!(
            previous = previous.short_checksum(),
            current = current.short_checksum(),
            "comparing scope snapshots"
        );

        if previous.checksum() == current.checksum() {
            info!("checksums match, scope unchanged");
            return ScopeComparison {
                additions: Vec::new(),
                removals: Vec::new(),
                modifications: Vec::new(),
                unchanged_in_scope: current.in_scope().clone(),
                unchanged_out_scope: current.out_of_scope().clone(),
                has_changes: false,
            };
        }

        let (prev_in, curr_in) = (previous.in_scope(), current.in_scope());
        let (prev_out, curr_out) = (previous.out_of_scope(), current.out_of_scope());

        let added_in: BTreeSet<&String> = curr_in.difference(prev_in).collect();
        let removed_in: BTreeSet<&String> = prev_in.difference(curr_in).collect();
        let added_out: BTreeSet<&String> = curr_out.difference(prev_out).collect();
        let removed_out: BTreeSet<&String> = prev_out.difference(curr_out).collect();

        let mut additions = Vec::new();
        let mut removals = Vec::new();
        let mut modifications = Vec::new();

        for item in &added_in {
            if removed_out.contains(item) {
                modifications.push(ScopeChange::moved(
                    item,
                    RuleCategory::OutOfScope,
                    RuleCategory::InScope,
                ));
            } else {
                additions.push(ScopeChange::added(item, RuleCategory::InScope));
            }
        }

        for item in &added_out {
            if removed_in.contains(item) {
                modifications.push(ScopeChange::moved(
                    item,
                    RuleCategory::InScope,
                    RuleCategory::OutOfScope,
                ));
            } else {
                additions.push(ScopeChange::added(item, RuleCategory::OutOfScope));
            }
        }

        removals.extend(
            removed_in
                .iter()
                .filter(|item| !added_out.contains(*item))
                .map(|item| ScopeChange::removed(item, RuleCategory::InScope)),
        );
        removals.extend(
            removed_out
                .iter()
                .filter(|item| !added_in.contains(*item))
                .map(|item| ScopeChange::removed(item, RuleCategory::OutOfScope)),
        );

        modifications.sort_by(|a, b| a.item.cmp(&b.item));

        let has_changes =
            !(additions.is_empty() && removals.is_empty() && modifications.is_empty());

        info!(
            added = additions.len(),
            removed = removals.len(),
            modified = modifications.len(),
            "scope comparison complete"
        );

        ScopeComparison {
            additions,
            removals,
            modifications,
            unchanged_in_scope: prev_in.intersection(curr_in).cloned().collect(),
            unchanged_out_scope: prev_out.intersection(curr_out).cloned().collect(),
            has_changes,
        }
    }
}

/// Compare two snapshots with a default comparator.
#[must_use]
pub fn compare(previous: &ScopeSnapshot, current: &ScopeSnapshot) -> ScopeComparison {
    ScopeComparator::new().compare(previous, current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(in_scope: &[&str], out_of_scope: &[&str]) -> ScopeSnapshot {
        ScopeSnapshot::new(in_scope.iter().copied(), out_of_scope.iter().copied())
    }

    #[test]
    fn test_identical_checksum_fast_path() {
        let previous = snap(&["b.com", "a.com"], &["x.a.com"]);
        let current = snap(&["a.com", "b.com", "a.com"], &["x.a.com"]);

        let comparison = compare(&previous, &current);
        assert!(!comparison.has_changes);
        assert_eq!(comparison.changes().count(), 0);
        assert_eq!(comparison.unchanged_in_scope.len(), 2);
        assert_eq!(comparison.unchanged_out_scope.len(), 1);
        assert_eq!(comparison.summary(), "No scope changes detected");
    }

    #[test]
    fn test_additions_and_removals_per_category() {
        let previous = snap(&["a.com", "b.com"], &["old.a.com"]);
        let current = snap(&["a.com", "c.com"], &["new.a.com"]);

        let comparison = compare(&previous, &current);
        assert!(comparison.has_changes);

        let added: Vec<(&str, RuleCategory)> = comparison
            .additions
            .iter()
            .map(|c| (c.item.as_str(), c.category))
            .collect();
        assert_eq!(
            added,
            vec![
                ("c.com", RuleCategory::InScope),
                ("new.a.com", RuleCategory::OutOfScope)
            ]
        );

        let removed: Vec<(&str, RuleCategory)> = comparison
            .removals
            .iter()
            .map(|c| (c.item.as_str(), c.category))
            .collect();
        assert_eq!(
            removed,
            vec![
                ("b.com", RuleCategory::InScope),
                ("old.a.com", RuleCategory::OutOfScope)
            ]
        );

        assert!(comparison.unchanged_in_scope.contains("a.com"));
        assert_eq!(comparison.summary(), "2 added, 2 removed");
    }

    #[test]
    fn test_reclassification_reported_once() {
        let previous = snap(&["x.com"], &[]);
        let current = snap(&[], &["x.com"]);

        let comparison = compare(&previous, &current);
        assert!(comparison.additions.is_empty());
        assert!(comparison.removals.is_empty());
        assert_eq!(comparison.modifications.len(), 1);

        let change = &comparison.modifications[0];
        assert_eq!(change.change_type, ScopeChangeType::Modified);
        assert_eq!(change.item, "x.com");
        assert_eq!(change.category, RuleCategory::OutOfScope);
        assert_eq!(change.previous_category, Some(RuleCategory::InScope));
    }

    #[test]
    fn test_reclassification_into_scope() {
        let previous = snap(&["a.com"], &["beta.a.com"]);
        let current = snap(&["a.com", "beta.a.com"], &[]);

        let comparison = compare(&previous, &current);
        assert_eq!(comparison.changes().count(), 1);
        assert_eq!(comparison.modifications[0].category, RuleCategory::InScope);
        assert_eq!(comparison.summary(), "1 modified");
    }

    #[test]
    fn test_item_in_both_categories_is_not_a_move() {
        // Added to out-of-scope while staying in-scope: a plain addition
        let previous = snap(&["x.com"], &[]);
        let current = snap(&["x.com"], &["x.com"]);

        let comparison = compare(&previous, &current);
        assert!(comparison.modifications.is_empty());
        assert_eq!(comparison.additions.len(), 1);
        assert_eq!(comparison.additions[0].category, RuleCategory::OutOfScope);
    }

    #[test]
    fn test_format_changes() {
        let previous = snap(&["x.com", "gone.com"], &[]);
        let current = snap(&["new.com"], &["x.com"]);

        let report = compare(&previous, &current).format_changes();
        let expected = "1 added, 1 removed, 1 modified\n\
                        \n\
                        Additions:\n  + [in_scope] new.com\n\
                        \n\
                        Removals:\n  - [in_scope] gone.com\n\
                        \n\
                        Modifications:\n  ~ x.com (in_scope -> out_of_scope)\n";
        assert_eq!(report, expected);
    }

    #[test]
    fn test_change_display() {
        let change = ScopeChange::added("*.a.com", RuleCategory::InScope);
        assert_eq!(change.to_string(), "+ [in_scope] *.a.com");
    }
}
