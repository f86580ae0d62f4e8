// Settings documents driving a panel

use std::fs;
use std::time::Duration;
use tempfile::TempDir;

use fpspack::core::cleaner::{CleanupCategory, CleanupEngine, DeleteMode};
use fpspack::core::tweaks::TweakCategory;
use fpspack::core::{CancelFlag, Panel, Settings, TargetMode};
use fpspack::platform::cleanup_dirs;
use fpspack::FpsError;

/// Settings whose AppTemp category only covers `scratch`
fn isolated_settings(dir: &TempDir) -> Settings {
    let mut settings = Settings {
        data_dir: Some(dir.path().join("data")),
        ..Settings::default()
    };
    settings.cleanup.min_file_age_hours = 0;
    settings.cleanup.excluded_default_paths = cleanup_dirs::default_roots(CleanupCategory::AppTemp);
    settings
        .cleanup
        .add_custom_path(CleanupCategory::AppTemp, dir.path().join("scratch"));
    settings
}

#[test]
fn test_saved_settings_round_trip_through_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");

    let mut settings = isolated_settings(&dir);
    settings.monitoring.interval_ms = 2500;
    settings.optimization.enabled_categories = vec![TweakCategory::Network];
    settings.save_to(&path).unwrap();

    let loaded = Settings::load_from(&path);
    assert_eq!(loaded, settings);
    assert_eq!(loaded.monitoring.interval(), Duration::from_millis(2500));
}

#[test]
fn test_hand_edited_document_is_clamped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(
        &path,
        r#"{ "monitoring": { "interval_ms": 5 }, "cleanup": { "min_file_age_hours": 6 } }"#,
    )
    .unwrap();

    let loaded = Settings::load_from(&path);
    assert_eq!(loaded.monitoring.interval_ms, 100);
    assert_eq!(loaded.cleanup.min_file_age_hours, 6);
    assert_eq!(loaded.monitoring.queue_bound, 16);
}

#[test]
fn test_huge_min_age_keeps_everything_instead_of_overflowing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, r#"{ "cleanup": { "min_file_age_hours": 18446744073709551615 } }"#).unwrap();

    let loaded = Settings::load_from(&path);
    assert_eq!(loaded.cleanup.min_file_age_hours, u64::MAX);

    let scratch = dir.path().join("scratch");
    fs::create_dir_all(&scratch).unwrap();
    fs::write(scratch.join("old.tmp"), b"data").unwrap();

    let mut target = loaded.cleanup.target(CleanupCategory::SystemTemp);
    assert_eq!(target.exclusions.min_age, Duration::from_secs(u64::MAX));
    target.root_paths = vec![scratch];
    let plan = CleanupEngine::new().plan(&target);
    assert!(plan.is_empty());
    assert_eq!(plan.excluded_count(), 1);
}

#[test]
fn test_delete_mode_from_settings_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(
        &path,
        r#"{ "cleanup": { "delete_modes": { "system_temp": "recoverable" } } }"#,
    )
    .unwrap();

    let loaded = Settings::load_from(&path);
    assert_eq!(
        loaded.cleanup.target(CleanupCategory::SystemTemp).delete_mode,
        DeleteMode::Recoverable
    );
    assert_eq!(
        loaded.cleanup.target(CleanupCategory::AppTemp).delete_mode,
        DeleteMode::Permanent
    );
    assert_eq!(
        loaded.cleanup.target(CleanupCategory::RecycleBin).delete_mode,
        DeleteMode::Recoverable
    );
}

#[test]
fn test_custom_path_is_not_added_twice() {
    let dir = TempDir::new().unwrap();
    let mut settings = isolated_settings(&dir);
    assert!(!settings
        .cleanup
        .add_custom_path(CleanupCategory::AppTemp, dir.path().join("scratch")));
    assert_eq!(
        settings.cleanup.roots(CleanupCategory::AppTemp),
        vec![dir.path().join("scratch")]
    );
}

#[tokio::test]
async fn test_panel_cleans_configured_root_but_not_protected_path() {
    let dir = TempDir::new().unwrap();
    let scratch = dir.path().join("scratch");
    fs::create_dir_all(scratch.join("keep")).unwrap();
    fs::write(scratch.join("shader.bin"), vec![0u8; 512]).unwrap();
    fs::write(scratch.join("keep").join("profile.bin"), vec![0u8; 512]).unwrap();

    let mut settings = isolated_settings(&dir);
    settings.cleanup.protected_paths = vec![scratch.join("keep")];
    let panel = Panel::open(settings, TargetMode::Simulated).unwrap();

    let target = panel.cleanup_target(CleanupCategory::AppTemp);
    let plan = panel.plan_cleanup(target).await.unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.estimated_reclaim_bytes(), 512);

    let report = panel.clean(plan, CancelFlag::new(), |_, _| {}).await.unwrap();
    assert_eq!(report.deleted_count, 1);
    assert!(!scratch.join("shader.bin").exists());
    assert!(scratch.join("keep").join("profile.bin").exists());
}

#[tokio::test]
async fn test_disabled_tweak_category_blocks_apply_but_not_revert() {
    let dir = TempDir::new().unwrap();
    let data = isolated_settings(&dir);

    {
        let panel = Panel::open(data.clone(), TargetMode::Simulated).unwrap();
        panel.apply("disable-fax-service").await.unwrap();
    }

    let mut restricted = data;
    restricted.optimization.enabled_categories = vec![TweakCategory::Network];
    let panel = Panel::open(restricted, TargetMode::Simulated).unwrap();

    assert!(matches!(
        panel.apply("disable-game-dvr").await,
        Err(FpsError::Config(_))
    ));
    assert!(panel.revert("disable-fax-service").await.is_ok());
    assert!(panel
        .tweaks(None)
        .iter()
        .all(|t| t.category == TweakCategory::Network));
}
