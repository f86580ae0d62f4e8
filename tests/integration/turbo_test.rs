// Turbo sessions through a simulated panel

use std::fs;
use std::time::Duration;
use tempfile::TempDir;

use fpspack::core::cleaner::{CleanupCategory, CleanupTarget};
use fpspack::core::turbo::TurboItem;
use fpspack::core::{
    ApplyOutcome, CancelFlag, ItemOutcome, Panel, RiskClass, Settings, TargetMode, TurboSelection,
};

fn settings(dir: &TempDir) -> Settings {
    Settings {
        data_dir: Some(dir.path().join("data")),
        ..Settings::default()
    }
}

fn scratch_target(dir: &TempDir) -> CleanupTarget {
    let root = dir.path().join("scratch");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("a.tmp"), vec![0u8; 2048]).unwrap();
    fs::write(root.join("b.tmp"), vec![0u8; 1024]).unwrap();
    CleanupTarget::new(CleanupCategory::SystemTemp, vec![root]).with_min_age(Duration::ZERO)
}

#[tokio::test]
async fn test_default_turbo_holds_back_high_risk() {
    let dir = TempDir::new().unwrap();
    let panel = Panel::open(settings(&dir), TargetMode::Simulated).unwrap();

    let mut selection = panel.turbo_selection();
    selection.cleanup_targets = vec![scratch_target(&dir)];
    let session = panel.turbo(selection, CancelFlag::new()).await.unwrap();

    assert!(!session.cancelled);
    assert_eq!(session.failure_count(), 0);
    assert_eq!(session.needs_confirmation(), vec!["manual-biometric-service"]);
    let held = session
        .results
        .iter()
        .find(|r| r.item == TurboItem::Tweak("manual-biometric-service".to_string()))
        .unwrap();
    assert!(matches!(held.outcome, ItemOutcome::ConfirmationRequired(RiskClass::High)));

    assert!(session.applied_tweaks().contains(&"disable-fax-service".to_string()));
    assert_eq!(session.reclaimed_bytes(), 3072);
    assert!(!dir.path().join("scratch").join("a.tmp").exists());
}

#[tokio::test]
async fn test_confirmed_high_risk_is_applied() {
    let dir = TempDir::new().unwrap();
    let panel = Panel::open(settings(&dir), TargetMode::Simulated).unwrap();

    let selection = TurboSelection::new(vec!["manual-biometric-service".to_string()], vec![])
        .confirm("manual-biometric-service");
    let session = panel.turbo(selection, CancelFlag::new()).await.unwrap();

    assert_eq!(session.applied_tweaks(), vec!["manual-biometric-service".to_string()]);
    assert!(session.needs_confirmation().is_empty());
}

#[tokio::test]
async fn test_session_survives_restart_and_deactivates() {
    let dir = TempDir::new().unwrap();
    let selection = TurboSelection::new(
        vec!["disable-fax-service".to_string(), "enable-game-mode".to_string()],
        vec![],
    );

    let session_id = {
        let panel = Panel::open(settings(&dir), TargetMode::Simulated).unwrap();
        panel.turbo(selection, CancelFlag::new()).await.unwrap().id
    };

    let panel = Panel::open(settings(&dir), TargetMode::Simulated).unwrap();
    let record = panel.last_session().unwrap().unwrap();
    assert_eq!(record.id, session_id);
    assert_eq!(record.applied_tweaks.len(), 2);

    let results = panel.deactivate_turbo().await.unwrap();
    assert_eq!(results.len(), 2);
    // Newest first
    assert_eq!(results[0].tweak_id, "enable-game-mode");
    assert!(results.iter().all(|r| r.outcome.is_ok()));
    assert!(panel.last_session().unwrap().is_none());

    // Reverted, so applying again changes the simulated value once more
    assert_eq!(panel.apply("disable-fax-service").await.unwrap(), ApplyOutcome::Applied);
}

#[tokio::test]
async fn test_back_to_back_sessions_deactivate_together() {
    let dir = TempDir::new().unwrap();

    {
        let panel = Panel::open(settings(&dir), TargetMode::Simulated).unwrap();
        let first = TurboSelection::new(vec!["disable-fax-service".to_string()], vec![]);
        panel.turbo(first, CancelFlag::new()).await.unwrap();
    }

    let panel = Panel::open(settings(&dir), TargetMode::Simulated).unwrap();
    let second = TurboSelection::new(vec!["enable-game-mode".to_string()], vec![]);
    let session = panel.turbo(second, CancelFlag::new()).await.unwrap();
    assert_eq!(session.applied_tweaks(), vec!["enable-game-mode".to_string()]);

    let pending = panel.last_session().unwrap().unwrap();
    assert_eq!(pending.applied_tweaks, vec!["disable-fax-service", "enable-game-mode"]);

    let results = panel.deactivate_turbo().await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.outcome.is_ok()));
    assert!(panel.last_session().unwrap().is_none());

    // The first session's tweak was undone too
    assert_eq!(panel.apply("disable-fax-service").await.unwrap(), ApplyOutcome::Applied);
}

#[tokio::test]
async fn test_cancelled_before_start_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let panel = Panel::open(settings(&dir), TargetMode::Simulated).unwrap();
    let target = scratch_target(&dir);

    let cancel = CancelFlag::new();
    cancel.cancel();
    let session = panel
        .turbo(
            TurboSelection::new(vec!["disable-fax-service".to_string()], vec![target]),
            cancel,
        )
        .await
        .unwrap();

    assert!(session.cancelled);
    assert!(session
        .results
        .iter()
        .all(|r| matches!(r.outcome, ItemOutcome::Cancelled)));
    assert!(dir.path().join("scratch").join("a.tmp").exists());
    assert!(panel.last_session().unwrap().is_none());
    assert!(panel.deactivate_turbo().await.is_err());
}
