//! Single entry point for a presentation layer.
//!
//! `Panel` wires the engines together from [`Settings`] and runs every
//! synchronous engine call on tokio's blocking pool, so callers on an async
//! runtime are never stalled by registry writes or directory walks.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::activity::{ActivityEvent, EventSink, FanoutSink, JsonlSink, LogSink, RecentEvents};
use crate::core::backup::{BackupRecord, BackupStore};
use crate::core::cancel::CancelFlag;
use crate::core::cleaner::{CleanupCategory, CleanupEngine, CleanupPlan, CleanupPreview, CleanupReport, CleanupTarget};
use crate::core::config::Settings;
use crate::core::optimizer::{
    ApplyOutcome, InMemoryTargets, OptimizationEngine, RevertOutcome, SystemTargets, TargetApplier, TweakStatus,
};
use crate::core::system_monitor::{MetricsSampler, MonitorHub, MonitorRuntime, Subscription};
use crate::core::turbo::{DeactivationResult, SessionRecord, TurboOrchestrator, TurboSelection, TurboSession};
use crate::core::tweaks::{Tweak, TweakCatalog, TweakCategory};
use crate::error::{FpsError, Result};

const RECENT_EVENTS: usize = 64;

/// Where tweak targets live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetMode {
    /// Registry, services and TCP parameters of this machine
    System,
    /// In-process values persisted between runs; nothing on the OS changes
    Simulated,
}

struct Simulation {
    targets: Arc<InMemoryTargets>,
    path: PathBuf,
}

pub struct Panel {
    settings: Settings,
    optimizer: Arc<OptimizationEngine>,
    cleaner: Arc<CleanupEngine>,
    turbo: Arc<TurboOrchestrator>,
    hub: MonitorHub,
    recent: Arc<RecentEvents>,
    simulation: Option<Simulation>,
    session_path: PathBuf,
}

impl Panel {
    pub fn open(settings: Settings, mode: TargetMode) -> Result<Self> {
        match mode {
            TargetMode::System => Self::assemble(settings, Arc::new(SystemTargets::new()), None),
            TargetMode::Simulated => {
                let path = settings.simulation_path()?;
                let targets = Arc::new(load_simulation(&path));
                let simulation = Simulation {
                    targets: Arc::clone(&targets),
                    path,
                };
                Self::assemble(settings, targets, Some(simulation))
            }
        }
    }

    /// Panel over caller-supplied targets
    pub fn with_targets(settings: Settings, targets: Arc<dyn TargetApplier>) -> Result<Self> {
        Self::assemble(settings, targets, None)
    }

    fn assemble(
        settings: Settings,
        targets: Arc<dyn TargetApplier>,
        simulation: Option<Simulation>,
    ) -> Result<Self> {
        let recent = Arc::new(RecentEvents::new(RECENT_EVENTS));
        let mut sinks = FanoutSink::new()
            .with(Arc::new(LogSink))
            .with(Arc::clone(&recent) as Arc<dyn EventSink>);
        match JsonlSink::open(&settings.activity_log_path()?) {
            Ok(sink) => sinks = sinks.with(Arc::new(sink)),
            Err(e) => log::warn!("Activity log unavailable: {}", e),
        }
        let events: Arc<dyn EventSink> = Arc::new(sinks);

        let backups = Arc::new(BackupStore::open(&settings.backups_path()?)?);
        let optimizer = Arc::new(
            OptimizationEngine::new(Arc::new(TweakCatalog::builtin()), backups, targets)
                .with_events(Arc::clone(&events))
                .with_mutation_timeout(settings.optimization.mutation_timeout()),
        );
        let cleaner = Arc::new(CleanupEngine::new().with_events(Arc::clone(&events)));
        let turbo = Arc::new(
            TurboOrchestrator::new(
                Arc::clone(&optimizer),
                Arc::clone(&cleaner),
                settings.turbo.clone(),
            )
            .with_events(events),
        );

        Ok(Self {
            session_path: settings.session_path()?,
            settings,
            optimizer,
            cleaner,
            turbo,
            hub: MonitorHub::new(),
            recent,
            simulation,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_simulated(&self) -> bool {
        self.simulation.is_some()
    }

    // Monitoring

    pub fn hub(&self) -> MonitorHub {
        self.hub.clone()
    }

    /// Subscribe with the configured queue bound
    pub fn subscribe(&self) -> Subscription {
        self.hub.subscribe(self.settings.monitoring.queue_bound)
    }

    /// Start sampling real counters into this panel's hub
    pub fn start_monitor(&self) -> MonitorRuntime {
        let monitoring = &self.settings.monitoring;
        MonitorRuntime::spawn(
            MetricsSampler::system(monitoring.disk_scope),
            self.hub.clone(),
            monitoring.interval(),
        )
    }

    pub fn recent_events(&self) -> Vec<ActivityEvent> {
        self.recent.snapshot()
    }

    // Tweaks

    /// Tweaks in enabled categories
    pub fn tweaks(&self, category: Option<TweakCategory>) -> Vec<Tweak> {
        self.optimizer
            .catalog()
            .list(category)
            .into_iter()
            .filter(|t| self.settings.optimization.allows(t))
            .cloned()
            .collect()
    }

    pub async fn apply(&self, id: &str) -> Result<ApplyOutcome> {
        let tweak = self.optimizer.catalog().get(id)?;
        if !self.settings.optimization.allows(tweak) {
            return Err(FpsError::config(format!(
                "tweak category '{}' is disabled in settings",
                tweak.category
            )));
        }

        let optimizer = Arc::clone(&self.optimizer);
        let id = id.to_string();
        let outcome = blocking(move || optimizer.apply(&id)).await?;
        self.persist_simulation();
        outcome
    }

    /// Reverting is allowed whatever the enabled categories are
    pub async fn revert(&self, id: &str) -> Result<RevertOutcome> {
        let optimizer = Arc::clone(&self.optimizer);
        let id = id.to_string();
        let outcome = blocking(move || optimizer.revert(&id)).await?;
        self.persist_simulation();
        outcome
    }

    pub async fn status(&self, id: &str) -> Result<TweakStatus> {
        let optimizer = Arc::clone(&self.optimizer);
        let id = id.to_string();
        blocking(move || optimizer.status(&id)).await?
    }

    pub async fn status_all(&self) -> Result<Vec<TweakStatus>> {
        let optimizer = Arc::clone(&self.optimizer);
        blocking(move || optimizer.status_all()).await
    }

    pub fn backups(&self) -> Vec<BackupRecord> {
        self.optimizer.backups().list()
    }

    pub fn purge_backup(&self, id: &str) -> Result<bool> {
        self.optimizer.backups().purge(id)
    }

    // Cleanup

    pub fn cleanup_target(&self, category: CleanupCategory) -> CleanupTarget {
        self.settings.cleanup.target(category)
    }

    pub async fn plan_cleanup(&self, target: CleanupTarget) -> Result<CleanupPlan> {
        let cleaner = Arc::clone(&self.cleaner);
        blocking(move || cleaner.plan(&target)).await
    }

    /// Sizes of what each target would remove, deleting nothing
    pub async fn preview(&self, targets: Vec<CleanupTarget>) -> Result<CleanupPreview> {
        let cleaner = Arc::clone(&self.cleaner);
        blocking(move || cleaner.preview(&targets)).await
    }

    pub async fn preview_enabled(&self) -> Result<CleanupPreview> {
        self.preview(self.settings.cleanup.enabled_targets()).await
    }

    pub async fn clean<F>(&self, plan: CleanupPlan, cancel: CancelFlag, on_progress: F) -> Result<CleanupReport>
    where
        F: Fn(usize, usize) + Send + 'static,
    {
        let cleaner = Arc::clone(&self.cleaner);
        blocking(move || cleaner.execute_with_progress(plan, &cancel, on_progress)).await
    }

    // Turbo

    /// The configured default selection, limited to enabled categories
    pub fn turbo_selection(&self) -> TurboSelection {
        let mut selection = self
            .turbo
            .policy()
            .default_selection(|category| self.settings.cleanup.target(category));

        let catalog = self.optimizer.catalog();
        selection.tweak_ids.retain(|id| {
            catalog
                .get(id)
                .map_or(true, |tweak| self.settings.optimization.allows(tweak))
        });
        selection
            .cleanup_targets
            .retain(|t| self.settings.cleanup.enabled_categories.contains(&t.category));
        selection
    }

    /// Run a session and remember what it applied for [`Panel::deactivate_turbo`]
    pub async fn turbo(&self, selection: TurboSelection, cancel: CancelFlag) -> Result<TurboSession> {
        let turbo = Arc::clone(&self.turbo);
        let session = blocking(move || turbo.run(selection, &cancel)).await?;
        self.persist_simulation();

        if !session.applied_tweaks().is_empty() {
            let record = match self.last_session() {
                Ok(Some(mut pending)) => {
                    pending.absorb(session.record());
                    pending
                }
                Ok(None) => session.record(),
                Err(e) => {
                    log::warn!("Replacing unreadable Turbo session record: {}", e);
                    session.record()
                }
            };
            write_json(&self.session_path, &record)?;
        }
        Ok(session)
    }

    /// Tweaks applied by every session since the last successful
    /// deactivation, merged into one record
    pub fn last_session(&self) -> Result<Option<SessionRecord>> {
        if !self.session_path.exists() {
            return Ok(None);
        }
        let data = fs::read(&self.session_path)?;
        Ok(Some(serde_json::from_slice(&data)?))
    }

    /// Revert the last session's tweaks. The session record is kept when any
    /// revert fails so the call can be repeated.
    pub async fn deactivate_turbo(&self) -> Result<Vec<DeactivationResult>> {
        let record = self
            .last_session()?
            .ok_or_else(|| FpsError::other("No Turbo session to deactivate"))?;

        let turbo = Arc::clone(&self.turbo);
        let results = blocking(move || turbo.deactivate(&record)).await?;
        self.persist_simulation();

        if results.iter().all(|r| r.outcome.is_ok()) {
            fs::remove_file(&self.session_path)?;
        }
        Ok(results)
    }

    fn persist_simulation(&self) {
        if let Some(sim) = &self.simulation {
            if let Err(e) = write_json(&sim.path, &sim.targets.snapshot()) {
                log::warn!("Could not save simulated targets to {:?}: {}", sim.path, e);
            }
        }
    }
}

async fn blocking<T, F>(job: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| FpsError::other(format!("worker task failed: {}", e)))
}

fn load_simulation(path: &Path) -> InMemoryTargets {
    let Ok(data) = fs::read(path) else {
        return InMemoryTargets::new();
    };
    match serde_json::from_slice(&data) {
        Ok(values) => InMemoryTargets::from_snapshot(values),
        Err(e) => {
            log::warn!("Simulated targets {:?} are corrupt: {}; starting fresh", path, e);
            InMemoryTargets::new()
        }
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec_pretty(value)?)?;
    Ok(())
}
