//! Per-program scope history.

use crate::comparator::{ScopeComparator, ScopeComparison};
use crate::rule::RuleCompiler;
use crate::snapshot::ScopeSnapshot;
use crate::validator::ScopeValidator;
use autobug_core::ProgramId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Latest scope snapshot per program.
///
/// Updates compare against the stored snapshot and replace it while holding
/// the write lock, so concurrent updates for one program never interleave.
#[derive(Clone, Default)]
pub struct ScopeTracker {
    snapshots: Arc<RwLock<HashMap<ProgramId, ScopeSnapshot>>>,
    compiler: RuleCompiler,
}

impl ScopeTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker whose validators compile rules with `compiler`.
    #[must_use]
    pub fn with_compiler(compiler: RuleCompiler) -> Self {
        Self {
            snapshots: Arc::default(),
            compiler,
        }
    }

    /// Store `snapshot` as the program's current scope.
    ///
    /// Returns `None` for the first snapshot of a program, otherwise the
    /// comparison against the snapshot it replaced.
    pub fn update(&self, program: &ProgramId, snapshot: ScopeSnapshot) -> Option<ScopeComparison> {
        let mut snapshots = self
            .snapshots
            .write()
            .expect("acquire write lock on scope snapshots");

        let comparison = snapshots
            .get(program)
            .map(|previous| ScopeComparator::new().compare(previous, &snapshot));

        match &comparison {
            Some(c) if c.has_changes => {
                info!(program = %program, summary = %c.summary(), "scope changed");
            }
            Some(_) => {}
            None => {
                info!(
                    program = %program,
                    checksum = snapshot.short_checksum(),
                    "recorded initial scope"
                );
            }
        }

        snapshots.insert(program.clone(), snapshot);
        comparison
    }

    /// Current snapshot of a program.
    #[must_use]
    pub fn get(&self, program: &ProgramId) -> Option<ScopeSnapshot> {
        self.snapshots
            .read()
            .expect("acquire read lock on scope snapshots")
            .get(program)
            .cloned()
    }

    /// Validator bound to the program's current snapshot.
    #[must_use]
    pub fn validator_for(&self, program: &ProgramId) -> Option<ScopeValidator> {
        let snapshots = self
            .snapshots
            .read()
            .expect("acquire read lock on scope snapshots");

        snapshots
            .get(program)
            .map(|snapshot| ScopeValidator::with_compiler(snapshot, &self.compiler))
    }

    /// Tracked programs, sorted.
    #[must_use]
    pub fn programs(&self) -> Vec<ProgramId> {
        let snapshots = self
            .snapshots
            .read()
            .expect("acquire read lock on scope snapshots");

        let mut programs: Vec<ProgramId> = snapshots.keys().cloned().collect();
        programs.sort();
        programs
    }

    /// Number of tracked programs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots
            .read()
            .expect("acquire read lock on scope snapshots")
            .len()
    }

    /// Whether no program is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ScopeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeTracker")
            .field("programs", &self.len())
            .finish()
    }
}
