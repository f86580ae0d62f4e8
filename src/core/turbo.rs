//! One-shot "Turbo" batch: apply a curated set of tweaks, then run a set of
//! cleanups. Every item is attempted independently and reported; nothing is
//! retried and nothing stops the batch except cancellation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::core::activity::{ActivityEvent, EventSink, LogSink};
use crate::core::cancel::CancelFlag;
use crate::core::cleaner::{CleanupCategory, CleanupEngine, CleanupReport, CleanupTarget};
use crate::core::optimizer::{ApplyOutcome, OptimizationEngine, RevertOutcome};
use crate::core::tweaks::RiskClass;
use crate::error::{FpsError, Result};

const COMPONENT: &str = "turbo";

const DEFAULT_TWEAKS: &[&str] = &[
    "disable-sysmain-service",
    "manual-themes-service",
    "manual-print-spooler",
    "disable-fax-service",
    "manual-windows-search",
    "manual-tablet-input-service",
    "manual-biometric-service",
    "disable-wmp-network-service",
    "manual-xbox-auth-manager",
    "manual-xbox-game-save",
    "manual-xbox-networking",
    "manual-xbox-accessory",
    "tcp-autotuning-normal",
    "tcp-rss-enabled",
    "tcp-ecn-enabled",
    "tcp-timestamps-enabled",
    "system-responsiveness-gaming",
    "disable-game-dvr",
    "enable-game-mode",
];

const DEFAULT_CATEGORIES: &[CleanupCategory] = &[
    CleanupCategory::SystemTemp,
    CleanupCategory::SystemCache,
    CleanupCategory::BrowserCache,
    CleanupCategory::RecycleBin,
];

/// Which tweaks Turbo may apply without asking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurboPolicy {
    /// Highest risk applied without explicit confirmation
    pub max_auto_risk: RiskClass,
    pub default_tweaks: Vec<String>,
    pub default_categories: Vec<CleanupCategory>,
}

impl Default for TurboPolicy {
    fn default() -> Self {
        Self {
            max_auto_risk: RiskClass::Medium,
            default_tweaks: DEFAULT_TWEAKS.iter().map(|s| s.to_string()).collect(),
            default_categories: DEFAULT_CATEGORIES.to_vec(),
        }
    }
}

impl TurboPolicy {
    /// High risk is never applied automatically, whatever the setting says
    pub fn auto_ceiling(&self) -> RiskClass {
        self.max_auto_risk.min(RiskClass::Medium)
    }

    /// The curated selection, resolving each category to a concrete target
    pub fn default_selection<F>(&self, resolve: F) -> TurboSelection
    where
        F: Fn(CleanupCategory) -> CleanupTarget,
    {
        TurboSelection::new(
            self.default_tweaks.clone(),
            self.default_categories.iter().map(|c| resolve(*c)).collect(),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct TurboSelection {
    pub tweak_ids: Vec<String>,
    pub cleanup_targets: Vec<CleanupTarget>,
    /// Tweaks the user explicitly agreed to, regardless of risk
    pub confirmed: HashSet<String>,
}

impl TurboSelection {
    pub fn new(tweak_ids: Vec<String>, cleanup_targets: Vec<CleanupTarget>) -> Self {
        Self {
            tweak_ids,
            cleanup_targets,
            confirmed: HashSet::new(),
        }
    }

    pub fn confirm<S: Into<String>>(mut self, tweak_id: S) -> Self {
        self.confirmed.insert(tweak_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurboItem {
    Tweak(String),
    Cleanup(CleanupCategory),
}

impl fmt::Display for TurboItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurboItem::Tweak(id) => write!(f, "tweak {}", id),
            TurboItem::Cleanup(category) => write!(f, "cleanup {}", category),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ItemOutcome {
    Applied,
    AlreadyApplied,
    Cleaned(CleanupReport),
    Failed(String),
    /// Risk above the auto-apply ceiling; the target was not touched
    ConfirmationRequired(RiskClass),
    Cancelled,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ItemOutcome::Applied | ItemOutcome::AlreadyApplied | ItemOutcome::Cleaned(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct TurboItemResult {
    pub item: TurboItem,
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone)]
pub struct TurboSession {
    pub id: String,
    pub tweak_ids: Vec<String>,
    pub cleanup_categories: Vec<CleanupCategory>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<TurboItemResult>,
    pub cancelled: bool,
}

impl TurboSession {
    /// Tweaks this session actually changed, in application order
    pub fn applied_tweaks(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|r| match (&r.item, &r.outcome) {
                (TurboItem::Tweak(id), ItemOutcome::Applied) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn needs_confirmation(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter_map(|r| match (&r.item, &r.outcome) {
                (TurboItem::Tweak(id), ItemOutcome::ConfirmationRequired(_)) => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn reclaimed_bytes(&self) -> u64 {
        self.results
            .iter()
            .map(|r| match &r.outcome {
                ItemOutcome::Cleaned(report) => report.reclaimed_bytes,
                _ => 0,
            })
            .sum()
    }

    pub fn failure_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Failed(_)))
            .count()
    }

    pub fn record(&self) -> SessionRecord {
        SessionRecord {
            id: self.id.clone(),
            applied_tweaks: self.applied_tweaks(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

/// What is kept of a session so it can be deactivated later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub applied_tweaks: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Fold a later session into this one so a single deactivation undoes
    /// both. Tweaks keep the order they were first applied in.
    pub fn absorb(&mut self, later: SessionRecord) {
        for id in later.applied_tweaks {
            if !self.applied_tweaks.contains(&id) {
                self.applied_tweaks.push(id);
            }
        }
        self.started_at = self.started_at.min(later.started_at);
        self.finished_at = self.finished_at.max(later.finished_at);
    }
}

#[derive(Debug)]
pub struct DeactivationResult {
    pub tweak_id: String,
    pub outcome: Result<RevertOutcome>,
}

pub struct TurboOrchestrator {
    optimizer: Arc<OptimizationEngine>,
    cleaner: Arc<CleanupEngine>,
    policy: TurboPolicy,
    events: Arc<dyn EventSink>,
}

impl TurboOrchestrator {
    pub fn new(
        optimizer: Arc<OptimizationEngine>,
        cleaner: Arc<CleanupEngine>,
        policy: TurboPolicy,
    ) -> Self {
        Self {
            optimizer,
            cleaner,
            policy,
            events: Arc::new(LogSink),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn policy(&self) -> &TurboPolicy {
        &self.policy
    }

    pub fn run(&self, selection: TurboSelection, cancel: &CancelFlag) -> TurboSession {
        let started_at = Utc::now();
        let id = format!("turbo-{}", started_at.format("%Y%m%d-%H%M%S%.3f"));
        let ceiling = self.policy.auto_ceiling();
        let mut results = Vec::with_capacity(selection.tweak_ids.len() + selection.cleanup_targets.len());

        self.events.emit(
            &ActivityEvent::info(COMPONENT, "Turbo session started")
                .with("session", &id)
                .with("tweaks", selection.tweak_ids.len())
                .with("cleanups", selection.cleanup_targets.len()),
        );

        for tweak_id in &selection.tweak_ids {
            let item = TurboItem::Tweak(tweak_id.clone());
            let outcome = if cancel.is_cancelled() {
                ItemOutcome::Cancelled
            } else {
                self.apply_tweak(tweak_id, ceiling, &selection.confirmed)
            };
            results.push(TurboItemResult { item, outcome });
        }

        for target in &selection.cleanup_targets {
            let item = TurboItem::Cleanup(target.category);
            let outcome = if cancel.is_cancelled() {
                ItemOutcome::Cancelled
            } else {
                let plan = self.cleaner.plan(target);
                ItemOutcome::Cleaned(self.cleaner.execute(plan, cancel))
            };
            results.push(TurboItemResult { item, outcome });
        }

        let session = TurboSession {
            id,
            tweak_ids: selection.tweak_ids,
            cleanup_categories: selection.cleanup_targets.iter().map(|t| t.category).collect(),
            started_at,
            finished_at: Utc::now(),
            results,
            cancelled: cancel.is_cancelled(),
        };

        self.events.emit(
            &ActivityEvent::info(COMPONENT, "Turbo session finished")
                .with("session", &session.id)
                .with("applied", session.applied_tweaks().len())
                .with("failed", session.failure_count())
                .with("reclaimed_bytes", session.reclaimed_bytes())
                .with("cancelled", session.cancelled),
        );
        session
    }

    fn apply_tweak(&self, id: &str, ceiling: RiskClass, confirmed: &HashSet<String>) -> ItemOutcome {
        let risk = match self.optimizer.catalog().get(id) {
            Ok(tweak) => tweak.risk,
            Err(e) => return ItemOutcome::Failed(e.to_string()),
        };

        if risk > ceiling && !confirmed.contains(id) {
            self.events.emit(
                &ActivityEvent::warning(COMPONENT, "Confirmation required")
                    .with("tweak", id)
                    .with("risk", risk),
            );
            return ItemOutcome::ConfirmationRequired(risk);
        }

        match self.optimizer.apply(id) {
            Ok(ApplyOutcome::Applied) => ItemOutcome::Applied,
            Ok(ApplyOutcome::AlreadyApplied) => ItemOutcome::AlreadyApplied,
            Err(e) => ItemOutcome::Failed(e.to_string()),
        }
    }

    /// Revert every tweak the session applied, newest first
    pub fn deactivate(&self, session: &SessionRecord) -> Vec<DeactivationResult> {
        let results: Vec<DeactivationResult> = session
            .applied_tweaks
            .iter()
            .rev()
            .map(|id| DeactivationResult {
                tweak_id: id.clone(),
                outcome: self.optimizer.revert(id),
            })
            .collect();

        let failed = results.iter().filter(|r| r.outcome.is_err()).count();
        self.events.emit(
            &ActivityEvent::info(COMPONENT, "Turbo session deactivated")
                .with("session", &session.id)
                .with("reverted", results.len() - failed)
                .with("failed", failed),
        );
        results
    }
}

/// Parse user-supplied category names, reporting the first unknown one
pub fn parse_categories(names: &[String]) -> Result<Vec<CleanupCategory>> {
    names
        .iter()
        .map(|name| {
            CleanupCategory::parse(name)
                .ok_or_else(|| FpsError::config(format!("unknown cleanup category '{}'", name)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backup::BackupStore;
    use crate::core::optimizer::InMemoryTargets;
    use crate::core::tweaks::{TargetValue, Tweak, TweakCatalog, TweakCategory, TweakTarget};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn catalog() -> Arc<TweakCatalog> {
        Arc::new(
            TweakCatalog::new(vec![
                Tweak::new(
                    "low",
                    "Low",
                    TweakCategory::Services,
                    TweakTarget::service("Fax"),
                    TargetValue::text("Disabled"),
                    RiskClass::Low,
                ),
                Tweak::new(
                    "high",
                    "High",
                    TweakCategory::Gaming,
                    TweakTarget::network("rss"),
                    TargetValue::text("enabled"),
                    RiskClass::High,
                ),
            ])
            .unwrap(),
        )
    }

    fn orchestrator(dir: &TempDir, targets: Arc<InMemoryTargets>) -> TurboOrchestrator {
        let backups = Arc::new(BackupStore::open(&dir.path().join("backups.json")).unwrap());
        let optimizer = Arc::new(OptimizationEngine::new(catalog(), backups, targets));
        TurboOrchestrator::new(optimizer, Arc::new(CleanupEngine::new()), TurboPolicy::default())
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_high_risk_requires_confirmation() {
        let dir = TempDir::new().unwrap();
        let targets = Arc::new(InMemoryTargets::new());
        let turbo = orchestrator(&dir, targets.clone());

        let session = turbo.run(TurboSelection::new(ids(&["low", "high"]), vec![]), &CancelFlag::new());
        assert!(matches!(session.results[0].outcome, ItemOutcome::Applied));
        assert!(matches!(
            session.results[1].outcome,
            ItemOutcome::ConfirmationRequired(RiskClass::High)
        ));
        assert_eq!(targets.get(&TweakTarget::network("rss")), None);
        assert_eq!(session.needs_confirmation(), vec!["high"]);
    }

    #[test]
    fn test_confirmed_high_risk_is_applied() {
        let dir = TempDir::new().unwrap();
        let turbo = orchestrator(&dir, Arc::new(InMemoryTargets::new()));
        let selection = TurboSelection::new(ids(&["high"]), vec![]).confirm("high");
        let session = turbo.run(selection, &CancelFlag::new());
        assert!(matches!(session.results[0].outcome, ItemOutcome::Applied));
    }

    #[test]
    fn test_unknown_tweak_fails_and_batch_continues() {
        let dir = TempDir::new().unwrap();
        let turbo = orchestrator(&dir, Arc::new(InMemoryTargets::new()));
        let session = turbo.run(TurboSelection::new(ids(&["nope", "low"]), vec![]), &CancelFlag::new());
        assert!(matches!(session.results[0].outcome, ItemOutcome::Failed(_)));
        assert!(matches!(session.results[1].outcome, ItemOutcome::Applied));
        assert_eq!(session.failure_count(), 1);
    }

    #[test]
    fn test_cancelled_session_reports_remaining_items() {
        let dir = TempDir::new().unwrap();
        let turbo = orchestrator(&dir, Arc::new(InMemoryTargets::new()));
        let cancel = CancelFlag::new();
        cancel.cancel();

        let target = CleanupTarget::new(CleanupCategory::SystemTemp, vec![dir.path().to_path_buf()]);
        let session = turbo.run(TurboSelection::new(ids(&["low"]), vec![target]), &cancel);
        assert!(session.cancelled);
        assert!(session
            .results
            .iter()
            .all(|r| matches!(r.outcome, ItemOutcome::Cancelled)));
    }

    #[test]
    fn test_cleanup_items_run_after_tweaks() {
        let dir = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        fs::write(scratch.path().join("a.tmp"), vec![0u8; 64]).unwrap();
        let turbo = orchestrator(&dir, Arc::new(InMemoryTargets::new()));

        let target = CleanupTarget::new(CleanupCategory::SystemTemp, vec![scratch.path().to_path_buf()])
            .with_min_age(Duration::ZERO);
        let session = turbo.run(TurboSelection::new(ids(&["low"]), vec![target]), &CancelFlag::new());

        assert_eq!(session.results[1].item, TurboItem::Cleanup(CleanupCategory::SystemTemp));
        assert_eq!(session.reclaimed_bytes(), 64);
    }

    #[test]
    fn test_deactivate_reverts_applied_tweaks() {
        let dir = TempDir::new().unwrap();
        let fax = TweakTarget::service("Fax");
        let targets = Arc::new(InMemoryTargets::new().with_value(&fax, TargetValue::text("Manual")));
        let turbo = orchestrator(&dir, targets.clone());

        let session = turbo.run(TurboSelection::new(ids(&["low"]), vec![]), &CancelFlag::new());
        assert_eq!(targets.get(&fax), Some(TargetValue::text("Disabled")));

        let results = turbo.deactivate(&session.record());
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].outcome, Ok(RevertOutcome::RolledBack)));
        assert_eq!(targets.get(&fax), Some(TargetValue::text("Manual")));
    }

    #[test]
    fn test_absorbed_session_keeps_first_apply_order() {
        let t0 = Utc::now();
        let mut first = SessionRecord {
            id: "first".to_string(),
            applied_tweaks: vec!["disable-fax-service".to_string(), "tcp-ecn-enabled".to_string()],
            started_at: t0,
            finished_at: t0,
        };
        let later = SessionRecord {
            id: "second".to_string(),
            applied_tweaks: vec!["tcp-ecn-enabled".to_string(), "disable-game-dvr".to_string()],
            started_at: t0 + chrono::Duration::seconds(60),
            finished_at: t0 + chrono::Duration::seconds(61),
        };

        first.absorb(later);
        assert_eq!(first.id, "first");
        assert_eq!(
            first.applied_tweaks,
            vec!["disable-fax-service", "tcp-ecn-enabled", "disable-game-dvr"]
        );
        assert_eq!(first.started_at, t0);
        assert_eq!(first.finished_at, t0 + chrono::Duration::seconds(61));
    }

    #[test]
    fn test_policy_never_auto_applies_high() {
        let policy = TurboPolicy {
            max_auto_risk: RiskClass::High,
            ..TurboPolicy::default()
        };
        assert_eq!(policy.auto_ceiling(), RiskClass::Medium);
    }

    #[test]
    fn test_default_tweaks_exist_in_builtin_catalog() {
        let catalog = TweakCatalog::builtin();
        for id in TurboPolicy::default().default_tweaks {
            assert!(catalog.get(&id).is_ok(), "{} missing from catalog", id);
        }
    }

    #[test]
    fn test_parse_categories() {
        assert_eq!(
            parse_categories(&ids(&["system_temp", "recycle-bin"])).unwrap(),
            vec![CleanupCategory::SystemTemp, CleanupCategory::RecycleBin]
        );
        assert!(parse_categories(&ids(&["registry"])).is_err());
    }
}
