//! Reversible application of catalog tweaks.
//!
//! Every mutation follows the same sequence: take the per-target lock, read
//! the current value, persist it in the [`BackupStore`], then write the
//! desired value on a worker thread bounded by the mutation timeout. The
//! worker owns the target lock, so a timed-out write still finishes (and
//! records its real outcome) before anyone else can touch that target.

mod locks;
mod targets;

pub use locks::{TargetGuard, TargetLocks};
pub use targets::{InMemoryTargets, SystemTargets, TargetApplier};

use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::core::activity::{ActivityEvent, EventSink, LogSink};
use crate::core::backup::{ApplicationStatus, BackupRecord, BackupStore, PreviousValue};
use crate::core::tweaks::{TargetValue, Tweak, TweakCatalog};
use crate::error::{FpsError, Result};

const COMPONENT: &str = "optimizer";

pub const DEFAULT_MUTATION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    AlreadyApplied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertOutcome {
    RolledBack,
    AlreadyReverted,
}

/// Whether a tweak is currently in effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweakState {
    /// The target holds the desired value
    Active,
    Inactive,
    /// Applied by us, but something changed the value since
    Drifted,
    /// The last apply failed
    Failed,
    /// The current value could not be read
    Unreadable,
}

impl fmt::Display for TweakState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TweakState::Active => "active",
            TweakState::Inactive => "inactive",
            TweakState::Drifted => "drifted",
            TweakState::Failed => "failed",
            TweakState::Unreadable => "unreadable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct TweakStatus {
    pub tweak: Tweak,
    pub state: TweakState,
    pub current: Option<TargetValue>,
    pub read_error: Option<String>,
    pub record: Option<BackupRecord>,
}

pub struct OptimizationEngine {
    catalog: Arc<TweakCatalog>,
    backups: Arc<BackupStore>,
    targets: Arc<dyn TargetApplier>,
    locks: TargetLocks,
    events: Arc<dyn EventSink>,
    mutation_timeout: Duration,
}

impl OptimizationEngine {
    pub fn new(
        catalog: Arc<TweakCatalog>,
        backups: Arc<BackupStore>,
        targets: Arc<dyn TargetApplier>,
    ) -> Self {
        Self {
            catalog,
            backups,
            targets,
            locks: TargetLocks::new(),
            events: Arc::new(LogSink),
            mutation_timeout: DEFAULT_MUTATION_TIMEOUT,
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_mutation_timeout(mut self, timeout: Duration) -> Self {
        self.mutation_timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &TweakCatalog {
        &self.catalog
    }

    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    /// Apply a tweak, recording the previous value first
    pub fn apply(&self, id: &str) -> Result<ApplyOutcome> {
        let tweak = self.catalog.get(id)?.clone();
        let guard = self.locks.acquire(&tweak.target.path());

        let current = self.targets.read(&tweak.target)?;
        let in_effect = current
            .as_ref()
            .map_or(false, |value| value.matches(&tweak.desired));
        let recorded = self
            .backups
            .fetch(&tweak.id)
            .filter(|r| r.status == ApplicationStatus::Applied);

        if in_effect {
            self.events.emit(
                &ActivityEvent::info(COMPONENT, "Tweak already applied")
                    .with("tweak", &tweak.id)
                    .with("target", &tweak.target),
            );
            return Ok(ApplyOutcome::AlreadyApplied);
        }

        // A drifted Applied record keeps its original previous value
        let created_record = recorded.is_none();
        if created_record {
            let previous = PreviousValue::from(current.clone());
            self.backups.record(&tweak.id, &tweak.target, previous)?;
        } else {
            log::warn!(
                "Tweak '{}' drifted from {} to {:?}, re-applying",
                tweak.id,
                tweak.desired,
                current
            );
        }

        let targets = Arc::clone(&self.targets);
        let backups = Arc::clone(&self.backups);
        let events = Arc::clone(&self.events);
        let label = tweak.target.to_string();

        self.run_bounded(label, guard, move || {
            match targets.write(&tweak.target, &tweak.desired) {
                Ok(()) => {
                    events.emit(
                        &ActivityEvent::info(COMPONENT, "Tweak applied")
                            .with("tweak", &tweak.id)
                            .with("target", &tweak.target)
                            .with("value", &tweak.desired),
                    );
                    Ok(())
                }
                Err(e) => {
                    if created_record {
                        if let Err(mark) = backups.mark_failed(&tweak.id) {
                            log::warn!("Could not mark '{}' as failed: {}", tweak.id, mark);
                        }
                    }
                    events.emit(
                        &ActivityEvent::error(COMPONENT, "Tweak apply failed")
                            .with("tweak", &tweak.id)
                            .with("target", &tweak.target)
                            .with("reason", &e),
                    );
                    Err(e)
                }
            }
        })?;

        Ok(ApplyOutcome::Applied)
    }

    /// Restore the value recorded before the tweak was applied
    pub fn revert(&self, id: &str) -> Result<RevertOutcome> {
        let record = match self.backups.fetch(id) {
            Some(record) => record,
            None => {
                self.catalog.get(id)?;
                return Err(FpsError::no_backup(id));
            }
        };

        let guard = self.locks.acquire(&record.target.path());

        // Another caller may have reverted while we waited for the lock
        let record = self
            .backups
            .fetch(id)
            .ok_or_else(|| FpsError::no_backup(id))?;
        if record.status == ApplicationStatus::RolledBack {
            return Ok(RevertOutcome::AlreadyReverted);
        }

        let targets = Arc::clone(&self.targets);
        let backups = Arc::clone(&self.backups);
        let events = Arc::clone(&self.events);
        let label = record.target.to_string();

        self.run_bounded(label, guard, move || {
            let restored = match &record.previous {
                PreviousValue::Existed(value) => targets.write(&record.target, value),
                PreviousValue::NotExisted => targets.remove(&record.target),
            };

            match restored {
                Ok(()) => {
                    backups.mark_rolled_back(&record.tweak_id)?;
                    events.emit(
                        &ActivityEvent::info(COMPONENT, "Tweak reverted")
                            .with("tweak", &record.tweak_id)
                            .with("target", &record.target)
                            .with("value", &record.previous),
                    );
                    Ok(())
                }
                Err(e) => {
                    events.emit(
                        &ActivityEvent::error(COMPONENT, "Tweak revert failed")
                            .with("tweak", &record.tweak_id)
                            .with("target", &record.target)
                            .with("reason", &e),
                    );
                    Err(e)
                }
            }
        })?;

        Ok(RevertOutcome::RolledBack)
    }

    pub fn status(&self, id: &str) -> Result<TweakStatus> {
        let tweak = self.catalog.get(id)?.clone();
        let record = self.backups.fetch(id);

        let (current, read_error) = match self.targets.read(&tweak.target) {
            Ok(value) => (value, None),
            Err(e) => (None, Some(e.to_string())),
        };

        let in_effect = current
            .as_ref()
            .map_or(false, |value| value.matches(&tweak.desired));
        let status = record.as_ref().map(|r| r.status);

        let state = if read_error.is_some() {
            TweakState::Unreadable
        } else if in_effect {
            TweakState::Active
        } else {
            match status {
                Some(ApplicationStatus::Applied) => TweakState::Drifted,
                Some(ApplicationStatus::Failed) => TweakState::Failed,
                _ => TweakState::Inactive,
            }
        };

        Ok(TweakStatus {
            tweak,
            state,
            current,
            read_error,
            record,
        })
    }

    /// Status of every catalog tweak, in catalog order
    pub fn status_all(&self) -> Vec<TweakStatus> {
        self.catalog
            .list(None)
            .into_iter()
            .filter_map(|tweak| self.status(&tweak.id).ok())
            .collect()
    }

    /// Run `job` on a worker that owns the target lock. The caller waits at
    /// most the mutation timeout; the worker always runs to completion.
    fn run_bounded<F>(&self, label: String, guard: TargetGuard, job: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();

        thread::Builder::new()
            .name("fpspack-mutation".to_string())
            .spawn(move || {
                let _guard = guard;
                let result = job();
                let _ = tx.send(result);
            })
            .map_err(|e| FpsError::other(format!("Failed to start mutation worker: {}", e)))?;

        match rx.recv_timeout(self.mutation_timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                let millis = self.mutation_timeout.as_millis() as u64;
                self.events.emit(
                    &ActivityEvent::error(COMPONENT, "Mutation timed out")
                        .with("target", &label)
                        .with("timeout_ms", millis),
                );
                Err(FpsError::Timeout {
                    target: label,
                    millis,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(FpsError::other(format!(
                "Mutation worker for {} exited without a result",
                label
            ))),
        }
    }
}
