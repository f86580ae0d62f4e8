// Apply / revert behaviour against simulated OS targets

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

use fpspack::core::backup::{ApplicationStatus, BackupStore, PreviousValue};
use fpspack::core::optimizer::{InMemoryTargets, TargetApplier};
use fpspack::core::tweaks::{RegistryHive, TargetValue, TweakTarget};
use fpspack::core::{ApplyOutcome, OptimizationEngine, RevertOutcome, TweakCatalog, TweakState};
use fpspack::FpsError;

fn engine(dir: &TempDir, targets: Arc<InMemoryTargets>) -> OptimizationEngine {
    let backups = Arc::new(BackupStore::open(&dir.path().join("backups.json")).unwrap());
    OptimizationEngine::new(Arc::new(TweakCatalog::builtin()), backups, targets)
}

#[test]
fn test_telemetry_service_round_trip() {
    let dir = TempDir::new().unwrap();
    let diagtrack = TweakTarget::service("DiagTrack");
    let targets = Arc::new(InMemoryTargets::new().with_value(&diagtrack, TargetValue::text("Automatic")));
    let engine = engine(&dir, targets.clone());

    assert_eq!(engine.apply("disable-telemetry-service").unwrap(), ApplyOutcome::Applied);
    assert_eq!(targets.get(&diagtrack), Some(TargetValue::text("Disabled")));

    let record = engine.backups().fetch("disable-telemetry-service").unwrap();
    assert_eq!(record.previous, PreviousValue::Existed(TargetValue::text("Automatic")));
    assert_eq!(record.status, ApplicationStatus::Applied);
    assert_eq!(
        engine.status("disable-telemetry-service").unwrap().state,
        TweakState::Active
    );

    assert_eq!(engine.revert("disable-telemetry-service").unwrap(), RevertOutcome::RolledBack);
    assert_eq!(targets.get(&diagtrack), Some(TargetValue::text("Automatic")));
    assert_eq!(
        engine.backups().fetch("disable-telemetry-service").unwrap().status,
        ApplicationStatus::RolledBack
    );
    assert_eq!(
        engine.revert("disable-telemetry-service").unwrap(),
        RevertOutcome::AlreadyReverted
    );
}

#[test]
fn test_backup_survives_restart() {
    let dir = TempDir::new().unwrap();
    let targets = Arc::new(InMemoryTargets::new());
    engine(&dir, targets.clone()).apply("disable-game-dvr").unwrap();

    // A fresh engine over the same store can still roll back
    let restarted = engine(&dir, targets.clone());
    assert_eq!(restarted.revert("disable-game-dvr").unwrap(), RevertOutcome::RolledBack);

    let dvr = TweakTarget::registry(RegistryHive::CurrentUser, r"System\GameConfigStore", "GameDVR_Enabled");
    assert_eq!(targets.read(&dvr).unwrap(), None);
}

#[test]
fn test_revert_without_apply_is_no_backup() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir, Arc::new(InMemoryTargets::new()));
    assert!(matches!(
        engine.revert("disable-fax-service"),
        Err(FpsError::NoBackupFound(_))
    ));
    assert!(matches!(engine.apply("no-such-tweak"), Err(FpsError::NotFound(_))));
}

#[test]
fn test_double_apply_keeps_first_backup() {
    let dir = TempDir::new().unwrap();
    let fax = TweakTarget::service("Fax");
    let targets = Arc::new(InMemoryTargets::new().with_value(&fax, TargetValue::text("Manual")));
    let engine = engine(&dir, targets);

    assert_eq!(engine.apply("disable-fax-service").unwrap(), ApplyOutcome::Applied);
    let first = engine.backups().fetch("disable-fax-service").unwrap();

    assert_eq!(engine.apply("disable-fax-service").unwrap(), ApplyOutcome::AlreadyApplied);
    let second = engine.backups().fetch("disable-fax-service").unwrap();
    assert_eq!(first.token, second.token);
    assert_eq!(second.previous, PreviousValue::Existed(TargetValue::text("Manual")));
}

#[test]
fn test_distinct_targets_do_not_block_each_other() {
    let dir = TempDir::new().unwrap();
    let targets = Arc::new(InMemoryTargets::new());
    targets.set_write_delay(Duration::from_millis(400));
    let engine = Arc::new(engine(&dir, targets));

    let started = Instant::now();
    let handles: Vec<_> = ["disable-fax-service", "tcp-rss-enabled"]
        .into_iter()
        .map(|id| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.apply(id).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), ApplyOutcome::Applied);
    }
    assert!(started.elapsed() < Duration::from_millis(750));
}

#[test]
fn test_racing_apply_and_revert_of_one_tweak_leave_a_consistent_value() {
    let dir = TempDir::new().unwrap();
    let fax = TweakTarget::service("Fax");
    let targets = Arc::new(InMemoryTargets::new().with_value(&fax, TargetValue::text("Manual")));
    targets.set_write_delay(Duration::from_millis(100));
    let engine = Arc::new(engine(&dir, targets.clone()));

    for _ in 0..3 {
        engine.apply("disable-fax-service").unwrap();
        assert_eq!(targets.get(&fax), Some(TargetValue::text("Disabled")));

        let start = Arc::new(Barrier::new(2));
        let applier = {
            let engine = Arc::clone(&engine);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                engine.apply("disable-fax-service")
            })
        };
        let reverter = {
            let engine = Arc::clone(&engine);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                engine.revert("disable-fax-service")
            })
        };
        let applied = applier.join().unwrap().unwrap();
        assert_eq!(reverter.join().unwrap().unwrap(), RevertOutcome::RolledBack);

        assert!(!targets.overlapping_writes_seen());
        let record = engine.backups().fetch("disable-fax-service").unwrap();
        assert_eq!(record.previous, PreviousValue::Existed(TargetValue::text("Manual")));
        match applied {
            // apply went first and found the tweak in effect, revert won
            ApplyOutcome::AlreadyApplied => {
                assert_eq!(targets.get(&fax), Some(TargetValue::text("Manual")));
                assert_eq!(record.status, ApplicationStatus::RolledBack);
            }
            // revert went first, apply re-recorded and won
            ApplyOutcome::Applied => {
                assert_eq!(targets.get(&fax), Some(TargetValue::text("Disabled")));
                assert_eq!(record.status, ApplicationStatus::Applied);
                engine.revert("disable-fax-service").unwrap();
            }
        }
        assert_eq!(targets.get(&fax), Some(TargetValue::text("Manual")));
    }
}
