//! Rescan policy: which template tags to run for a detected change.
//!
//! The policy is an ordered table of rules. The first rule whose predicate
//! holds decides the tags, so each rule can be tested on its own.

use crate::detector::{ChangeCategory, Detection, FieldChange, TrackedField};
use autobug_core::DiffConfig;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Template tag vocabulary.
pub mod tags {
    /// Every template
    pub const ALL: &str = "all";
    /// Exposed files and endpoints
    pub const EXPOSURES: &str = "exposures";
    /// Login and admin panels
    pub const PANELS: &str = "panels";
    /// Default credentials
    pub const DEFAULT_LOGINS: &str = "default-logins";
    /// Technology-specific templates
    pub const TECH: &str = "tech";
    /// Network services
    pub const NETWORK: &str = "network";
    /// Hosting infrastructure
    pub const INFRASTRUCTURE: &str = "infrastructure";
    /// Misconfigurations
    pub const MISCONFIGURATION: &str = "misconfiguration";
}

/// How much of the template corpus a directive asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Every template
    Full,
    /// A tagged subset
    Targeted,
    /// Nothing
    Skip,
}

/// What to scan after an observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanDirective {
    /// Category reported by the detector
    pub category: ChangeCategory,
    /// Template tags to run; empty means skip
    pub tags: BTreeSet<String>,
    /// Policy rule that produced the tags
    pub rule: Option<&'static str>,
}

impl ScanDirective {
    /// Collapse the tag set into a scan mode.
    #[must_use]
    pub fn scan_mode(&self) -> ScanMode {
        if self.tags.contains(tags::ALL) {
            ScanMode::Full
        } else if self.tags.is_empty() {
            ScanMode::Skip
        } else {
            ScanMode::Targeted
        }
    }
}

impl fmt::Display for ScanDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
        write!(f, "{} [{}]", self.category, tags.join(","))?;
        if let Some(rule) = self.rule {
            write!(f, " via {rule}")?;
        }
        Ok(())
    }
}

/// One row of the rescan policy.
#[derive(Clone, Copy)]
pub struct PolicyRule {
    /// Rule name, recorded on the directive
    pub name: &'static str,
    /// Whether the rule fires for a change list
    pub applies: fn(&[FieldChange]) -> bool,
    /// Tags to run when the rule fires
    pub tags: fn(&[FieldChange]) -> BTreeSet<String>,
}

impl fmt::Debug for PolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyRule").field("name", &self.name).finish()
    }
}

/// The rescan policy, first match wins.
pub const POLICY: &[PolicyRule] = &[
    PolicyRule {
        name: "status-changed",
        applies: status_changed,
        tags: status_tags,
    },
    PolicyRule {
        name: "tech-changed",
        applies: tech_changed,
        tags: tech_tags,
    },
    PolicyRule {
        name: "content-only-changed",
        applies: only_content_changed,
        tags: full_tags,
    },
    PolicyRule {
        name: "ip-changed",
        applies: ip_changed,
        tags: ip_tags,
    },
    PolicyRule {
        name: "title-changed",
        applies: title_changed,
        tags: title_tags,
    },
];

fn has_change(changes: &[FieldChange], field: TrackedField) -> bool {
    changes.iter().any(|c| c.field() == field)
}

fn status_changed(changes: &[FieldChange]) -> bool {
    has_change(changes, TrackedField::StatusCode)
}

fn tech_changed(changes: &[FieldChange]) -> bool {
    has_change(changes, TrackedField::TechStack)
}

// Body changed but nothing else did: treat like a new asset.
fn only_content_changed(changes: &[FieldChange]) -> bool {
    matches!(changes, [only] if only.field() == TrackedField::ContentHash)
}

fn ip_changed(changes: &[FieldChange]) -> bool {
    has_change(changes, TrackedField::IpAddress)
}

fn title_changed(changes: &[FieldChange]) -> bool {
    has_change(changes, TrackedField::Title)
}

fn status_tags(_: &[FieldChange]) -> BTreeSet<String> {
    tag_set(&[tags::EXPOSURES, tags::PANELS, tags::DEFAULT_LOGINS])
}

fn full_tags(_: &[FieldChange]) -> BTreeSet<String> {
    tag_set(&[tags::ALL])
}

fn ip_tags(_: &[FieldChange]) -> BTreeSet<String> {
    tag_set(&[tags::NETWORK, tags::INFRASTRUCTURE])
}

fn title_tags(_: &[FieldChange]) -> BTreeSet<String> {
    tag_set(&[tags::EXPOSURES, tags::MISCONFIGURATION])
}

fn tag_set(tags: &[&str]) -> BTreeSet<String> {
    tags.iter().map(|t| (*t).to_string()).collect()
}

fn tech_tags(changes: &[FieldChange]) -> BTreeSet<String> {
    let mut set = tag_set(&[tags::TECH]);
    set.extend(
        changes
            .iter()
            .filter_map(FieldChange::added)
            .flatten()
            .map(|tech| tech.to_lowercase()),
    );
    set
}

/// Turns detections into scan directives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeClassifier {
    force: bool,
}

impl ChangeClassifier {
    /// Classifier that skips unchanged assets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rescan unchanged assets with every template when `force` is set.
    #[must_use]
    pub fn with_force(force: bool) -> Self {
        Self { force }
    }

    /// Classifier configured from the `[diff]` config section.
    #[must_use]
    pub fn from_config(config: &DiffConfig) -> Self {
        Self::with_force(config.force_rescan)
    }

    /// Decide what to scan for a detection.
    #[must_use]
    pub fn classify(&self, detection: &Detection) -> ScanDirective {
        let directive = match detection.category {
            ChangeCategory::New => ScanDirective {
                category: ChangeCategory::New,
                tags: full_tags(&detection.changes),
                rule: Some("new-asset"),
            },
            _ if detection.changes.is_empty() => ScanDirective {
                category: ChangeCategory::Unchanged,
                tags: if self.force {
                    tag_set(&[tags::ALL])
                } else {
                    BTreeSet::new()
                },
                rule: self.force.then_some("forced-rescan"),
            },
            category => POLICY
                .iter()
                .find(|rule| (rule.applies)(&detection.changes))
                .map_or_else(
                    || ScanDirective {
                        category,
                        tags: BTreeSet::new(),
                        rule: None,
                    },
                    |rule| ScanDirective {
                        category,
                        tags: (rule.tags)(&detection.changes),
                        rule: Some(rule.name),
                    },
                ),
        };

        debug!(directive = %directive, "classified change");
        directive
    }
}

/// Classify with a default (non-forcing) classifier.
#[must_use]
pub fn classify(detection: &Detection) -> ScanDirective {
    ChangeClassifier::new().classify(detection)
}
