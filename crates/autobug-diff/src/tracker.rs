//! Current asset state and append-only change history.

use crate::classifier::{ChangeClassifier, ScanDirective};
use crate::detector::{detect, Detection, FieldChange};
use crate::error::Result;
use crate::snapshot::{AssetSnapshot, RawProbe};
use autobug_core::{ProgramId, Timestamp};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

type AssetKey = (ProgramId, String);

// Same folding `AssetSnapshot::from_probe` applies to the asset value.
fn lookup_key(program_id: &ProgramId, value: &str) -> AssetKey {
    (program_id.clone(), value.trim().to_lowercase())
}

#[derive(Debug, Clone)]
struct AssetRecord {
    current: AssetSnapshot,
    history: Vec<FieldChange>,
}

/// Result of recording one observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Observation {
    /// What changed relative to the stored snapshot
    pub detection: Detection,
    /// What to scan as a consequence
    pub directive: ScanDirective,
}

/// Stores the current snapshot of every asset and its change history.
///
/// [`observe`](Self::observe) reads the stored snapshot, diffs, classifies
/// and writes back while holding the write lock, so two concurrent
/// observations of one asset never diff against the same stale state.
#[derive(Clone, Default)]
pub struct AssetTracker {
    assets: Arc<RwLock<HashMap<AssetKey, AssetRecord>>>,
    classifier: ChangeClassifier,
}

impl AssetTracker {
    /// Create an empty tracker with a default classifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker that classifies with `classifier`.
    #[must_use]
    pub fn with_classifier(classifier: ChangeClassifier) -> Self {
        Self {
            assets: Arc::default(),
            classifier,
        }
    }

    /// Record an observation and report what changed.
    pub fn observe(&self, snapshot: AssetSnapshot) -> Observation {
        let mut assets = self
            .assets
            .write()
            .expect("acquire write lock on assets");

        let key = (snapshot.program_id.clone(), snapshot.value.clone());
        let previous = assets.get(&key).map(|record| &record.current);

        let detection = detect(previous, &snapshot);
        let directive = self.classifier.classify(&detection);

        if !detection.changes.is_empty() {
            info!(
                program = %snapshot.program_id,
                asset = %snapshot.value,
                changes = detection.changes.len(),
                directive = %directive,
                "asset changed"
            );
        }

        match assets.get_mut(&key) {
            Some(record) => {
                record.current = snapshot.carry_forward(&record.current);
                record.history.extend(detection.changes.iter().cloned());
            }
            None => {
                info!(program = %snapshot.program_id, asset = %snapshot.value, "new asset");
                assets.insert(
                    key,
                    AssetRecord {
                        current: snapshot,
                        history: Vec::new(),
                    },
                );
            }
        }

        Observation {
            detection,
            directive,
        }
    }

    /// Normalize a probe record and observe it.
    ///
    /// # Errors
    /// Returns `DiffError::Snapshot` if the record has no asset value; nothing
    /// is stored in that case.
    pub fn observe_probe(
        &self,
        program_id: ProgramId,
        probe: &RawProbe,
        observed_at: Timestamp,
    ) -> Result<Observation> {
        let snapshot = AssetSnapshot::from_probe(program_id, probe, observed_at)?;
        Ok(self.observe(snapshot))
    }

    /// Current snapshot of an asset.
    #[must_use]
    pub fn current(&self, program_id: &ProgramId, value: &str) -> Option<AssetSnapshot> {
        let assets = self.assets.read().expect("acquire read lock on assets");
        assets
            .get(&lookup_key(program_id, value))
            .map(|record| record.current.clone())
    }

    /// Every change recorded for an asset, oldest first.
    #[must_use]
    pub fn history(&self, program_id: &ProgramId, value: &str) -> Vec<FieldChange> {
        let assets = self.assets.read().expect("acquire read lock on assets");
        assets
            .get(&lookup_key(program_id, value))
            .map(|record| record.history.clone())
            .unwrap_or_default()
    }

    /// Number of tracked assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.read().expect("acquire read lock on assets").len()
    }

    /// Whether no asset is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for AssetTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetTracker")
            .field("assets", &self.len())
            .field("classifier", &self.classifier)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{ChangeCategory, TrackedField};

    fn program() -> ProgramId {
        ProgramId::new("acme").expect("valid handle")
    }

    fn at(day: u32) -> Timestamp {
        Timestamp::from_rfc3339(&format!("2024-01-{day:02}T00:00:00Z")).expect("valid timestamp")
    }

    fn probe(status: u16) -> RawProbe {
        RawProbe {
            value: Some("admin.acme.com".to_string()),
            http_status: Some(status),
            ..RawProbe::default()
        }
    }

    #[test]
    fn test_observe_sequence() {
        let tracker = AssetTracker::new();

        let first = tracker
            .observe_probe(program(), &probe(403), at(1))
            .expect("valid probe");
        assert_eq!(first.detection.category, ChangeCategory::New);

        let second = tracker
            .observe_probe(program(), &probe(200), at(2))
            .expect("valid probe");
        assert_eq!(second.detection.category, ChangeCategory::Modified);
        assert_eq!(second.detection.changes[0].field(), TrackedField::StatusCode);

        let third = tracker
            .observe_probe(program(), &probe(200), at(3))
            .expect("valid probe");
        assert_eq!(third.detection.category, ChangeCategory::Unchanged);

        let current = tracker
            .current(&program(), "admin.acme.com")
            .expect("tracked asset");
        assert_eq!(current.first_seen, at(1));
        assert_eq!(current.last_seen, at(3));

        let history = tracker.history(&program(), "admin.acme.com");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].detected_at(), at(2));
    }

    #[test]
    fn test_lookups_fold_case_and_whitespace() {
        let tracker = AssetTracker::new();
        tracker
            .observe_probe(program(), &probe(403), at(1))
            .expect("valid probe");
        tracker
            .observe_probe(program(), &probe(200), at(2))
            .expect("valid probe");

        assert!(tracker.current(&program(), " Admin.ACME.com ").is_some());
        assert_eq!(tracker.history(&program(), "ADMIN.acme.com").len(), 1);
        assert!(tracker.current(&program(), "other.acme.com").is_none());
    }

    #[test]
    fn test_invalid_probe_is_not_stored() {
        let tracker = AssetTracker::new();
        let result = tracker.observe_probe(program(), &RawProbe::default(), at(1));
        assert!(result.is_err());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_concurrent_observations_report_each_change_once() {
        let tracker = AssetTracker::new();
        tracker
            .observe_probe(program(), &probe(403), at(1))
            .expect("valid probe");

        let observations: Vec<Observation> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let tracker = tracker.clone();
                    scope.spawn(move || {
                        tracker
                            .observe_probe(program(), &probe(200), at(2))
                            .expect("valid probe")
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("observer thread"))
                .collect()
        });

        let modified = observations
            .iter()
            .filter(|o| o.detection.category == ChangeCategory::Modified)
            .count();
        assert_eq!(modified, 1);
        assert_eq!(tracker.history(&program(), "admin.acme.com").len(), 1);
    }

    #[test]
    fn test_assets_keyed_per_program() {
        let tracker = AssetTracker::new();
        let other = ProgramId::new("globex").expect("valid handle");

        tracker
            .observe_probe(program(), &probe(200), at(1))
            .expect("valid probe");
        let observation = tracker
            .observe_probe(other, &probe(200), at(1))
            .expect("valid probe");

        assert_eq!(observation.detection.category, ChangeCategory::New);
        assert_eq!(tracker.len(), 2);
    }
}
