//! Change detection between two observations of one asset.

use crate::snapshot::AssetSnapshot;
use autobug_core::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, warn};

/// Overall verdict for an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCategory {
    /// No previous observation of this asset
    New,
    /// At least one tracked field changed
    Modified,
    /// No tracked field changed
    Unchanged,
}

impl ChangeCategory {
    /// Wire name of the category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Modified => "modified",
            Self::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields compared between observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedField {
    /// HTTP status code
    StatusCode,
    /// Detected technologies
    TechStack,
    /// Response body hash
    ContentHash,
    /// Page title
    Title,
    /// Resolved IP address
    IpAddress,
}

impl TrackedField {
    /// Comparison order; changes are reported in this order.
    pub const PRIORITY: [TrackedField; 5] = [
        Self::StatusCode,
        Self::TechStack,
        Self::ContentHash,
        Self::Title,
        Self::IpAddress,
    ];

    /// Wire name of the field.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StatusCode => "status_code",
            Self::TechStack => "tech_stack",
            Self::ContentHash => "content_hash",
            Self::Title => "title",
            Self::IpAddress => "ip_address",
        }
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a field changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldDelta {
    /// Single value changed, including to or from null
    Scalar {
        /// Previous value
        old: Option<String>,
        /// Current value
        new: Option<String>,
    },
    /// Set membership changed
    Set {
        /// Members only in the current observation
        added: BTreeSet<String>,
        /// Members only in the previous observation
        removed: BTreeSet<String>,
    },
}

/// One recorded change to one field. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    field: TrackedField,
    delta: FieldDelta,
    detected_at: Timestamp,
}

impl FieldChange {
    /// The field that changed.
    #[must_use]
    pub fn field(&self) -> TrackedField {
        self.field
    }

    /// Old and new values.
    #[must_use]
    pub fn delta(&self) -> &FieldDelta {
        &self.delta
    }

    /// Observation time of the snapshot that revealed the change.
    #[must_use]
    pub fn detected_at(&self) -> Timestamp {
        self.detected_at
    }

    /// Members added to a set field; `None` for scalar fields.
    #[must_use]
    pub fn added(&self) -> Option<&BTreeSet<String>> {
        match &self.delta {
            FieldDelta::Set { added, .. } => Some(added),
            FieldDelta::Scalar { .. } => None,
        }
    }
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.delta {
            FieldDelta::Scalar { old, new } => write!(
                f,
                "{}: {} -> {}",
                self.field,
                old.as_deref().unwrap_or("null"),
                new.as_deref().unwrap_or("null")
            ),
            FieldDelta::Set { added, removed } => {
                write!(f, "{}:", self.field)?;
                for item in added {
                    write!(f, " +{item}")?;
                }
                for item in removed {
                    write!(f, " -{item}")?;
                }
                Ok(())
            }
        }
    }
}

/// Detector output: a category plus changes in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    /// New, modified or unchanged
    pub category: ChangeCategory,
    /// Field changes, ordered by [`TrackedField::PRIORITY`]
    pub changes: Vec<FieldChange>,
}

impl Detection {
    /// Whether a given field is among the changes.
    #[must_use]
    pub fn changed(&self, field: TrackedField) -> bool {
        self.changes.iter().any(|c| c.field == field)
    }
}

/// Compare the previous observation of an asset with the current one.
///
/// A `previous` that belongs to a different asset is not history for
/// `current`; the observation is reported as new.
#[must_use]
pub fn detect(previous: Option<&AssetSnapshot>, current: &AssetSnapshot) -> Detection {
    let Some(previous) = previous else {
        debug!(asset = %current.value, "no previous observation");
        return Detection {
            category: ChangeCategory::New,
            changes: Vec::new(),
        };
    };

    if !previous.same_asset(current) {
        warn!(
            previous = %previous.value,
            current = %current.value,
            "previous snapshot belongs to a different asset, treating as new"
        );
        return Detection {
            category: ChangeCategory::New,
            changes: Vec::new(),
        };
    }

    let changes: Vec<FieldChange> = TrackedField::PRIORITY
        .iter()
        .filter_map(|field| {
            diff_field(*field, previous, current).map(|delta| FieldChange {
                field: *field,
                delta,
                detected_at: current.last_seen,
            })
        })
        .collect();

    let category = if changes.is_empty() {
        ChangeCategory::Unchanged
    } else {
        ChangeCategory::Modified
    };

    debug!(asset = %current.value, %category, changes = changes.len(), "detected changes");

    Detection { category, changes }
}

fn diff_field(
    field: TrackedField,
    previous: &AssetSnapshot,
    current: &AssetSnapshot,
) -> Option<FieldDelta> {
    match field {
        TrackedField::StatusCode => scalar(
            previous.http_status.map(|s| s.to_string()),
            current.http_status.map(|s| s.to_string()),
        ),
        TrackedField::TechStack => {
            let added: BTreeSet<String> = current
                .tech_stack
                .difference(&previous.tech_stack)
                .cloned()
                .collect();
            let removed: BTreeSet<String> = previous
                .tech_stack
                .difference(&current.tech_stack)
                .cloned()
                .collect();

            (!added.is_empty() || !removed.is_empty()).then_some(FieldDelta::Set { added, removed })
        }
        TrackedField::ContentHash => scalar(
            previous.response_hash.clone(),
            current.response_hash.clone(),
        ),
        TrackedField::Title => scalar(previous.title.clone(), current.title.clone()),
        TrackedField::IpAddress => scalar(previous.ip_address.clone(), current.ip_address.clone()),
    }
}

fn scalar(old: Option<String>, new: Option<String>) -> Option<FieldDelta> {
    (old != new).then_some(FieldDelta::Scalar { old, new })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::RawProbe;
    use autobug_core::ProgramId;

    fn snapshot(value: &str, probe: RawProbe) -> AssetSnapshot {
        let probe = RawProbe {
            value: Some(value.to_string()),
            ..probe
        };
        AssetSnapshot::from_probe(
            ProgramId::new("acme").expect("valid handle"),
            &probe,
            Timestamp::from_rfc3339("2024-03-01T12:00:00Z").expect("valid timestamp"),
        )
        .expect("valid probe")
    }

    fn tech(items: &[&str]) -> Option<Vec<String>> {
        Some(items.iter().map(|s| (*s).to_string()).collect())
    }

    #[test]
    fn test_no_previous_is_new() {
        let current = snapshot("acme.com", RawProbe::default());
        let detection = detect(None, &current);
        assert_eq!(detection.category, ChangeCategory::New);
        assert!(detection.changes.is_empty());
    }

    #[test]
    fn test_same_snapshot_is_unchanged() {
        let current = snapshot(
            "acme.com",
            RawProbe {
                http_status: Some(200),
                tech_stack: tech(&["nginx"]),
                ..RawProbe::default()
            },
        );
        let detection = detect(Some(&current), &current);
        assert_eq!(detection.category, ChangeCategory::Unchanged);
        assert!(detection.changes.is_empty());
    }

    #[test]
    fn test_changes_follow_priority_order() {
        let previous = snapshot(
            "acme.com",
            RawProbe {
                http_status: Some(403),
                title: Some("Forbidden".into()),
                ip_address: Some("10.0.0.1".into()),
                response_hash: Some("h1".into()),
                ..RawProbe::default()
            },
        );
        let current = snapshot(
            "acme.com",
            RawProbe {
                http_status: Some(200),
                title: Some("Admin".into()),
                ip_address: Some("10.0.0.2".into()),
                response_hash: Some("h2".into()),
                tech_stack: tech(&["grafana"]),
                ..RawProbe::default()
            },
        );

        let detection = detect(Some(&previous), &current);
        assert_eq!(detection.category, ChangeCategory::Modified);
        let fields: Vec<TrackedField> = detection.changes.iter().map(FieldChange::field).collect();
        assert_eq!(fields, TrackedField::PRIORITY.to_vec());
        assert_eq!(detection.changes[0].to_string(), "status_code: 403 -> 200");
        assert_eq!(detection.changes[0].detected_at(), current.last_seen);
    }

    #[test]
    fn test_null_transitions_are_changes() {
        let previous = snapshot("acme.com", RawProbe::default());
        let current = snapshot(
            "acme.com",
            RawProbe {
                title: Some("Login".into()),
                ..RawProbe::default()
            },
        );

        let detection = detect(Some(&previous), &current);
        assert_eq!(detection.changes.len(), 1);
        assert_eq!(
            detection.changes[0].delta(),
            &FieldDelta::Scalar {
                old: None,
                new: Some("Login".to_string())
            }
        );
        assert!(detection.changed(TrackedField::Title));
    }

    #[test]
    fn test_tech_stack_is_a_set_diff() {
        let previous = snapshot(
            "acme.com",
            RawProbe {
                tech_stack: tech(&["nginx", "php"]),
                ..RawProbe::default()
            },
        );
        let reordered = snapshot(
            "acme.com",
            RawProbe {
                tech_stack: tech(&["php", "nginx"]),
                ..RawProbe::default()
            },
        );
        assert!(detect(Some(&previous), &reordered).changes.is_empty());

        let current = snapshot(
            "acme.com",
            RawProbe {
                tech_stack: tech(&["nginx", "wordpress"]),
                ..RawProbe::default()
            },
        );
        let detection = detect(Some(&previous), &current);
        assert_eq!(detection.changes.len(), 1);
        assert_eq!(detection.changes[0].to_string(), "tech_stack: +wordpress -php");
    }

    #[test]
    fn test_different_identity_is_new() {
        let previous = snapshot("a.acme.com", RawProbe::default());
        let current = snapshot("b.acme.com", RawProbe::default());
        assert_eq!(detect(Some(&previous), &current).category, ChangeCategory::New);
    }
}
