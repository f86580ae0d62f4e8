// Plan / execute cleanup against a scratch directory

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use fpspack::core::cleaner::{
    CleanupCategory, CleanupEngine, CleanupTarget, DeleteMode, FileOps, SkipReason,
};
use fpspack::core::CancelFlag;

const MB: usize = 1024 * 1024;

/// Deletes for real, but reports chosen paths as held open
#[derive(Default)]
struct LockingFileOps {
    locked: Mutex<HashSet<PathBuf>>,
}

impl LockingFileOps {
    fn lock(&self, path: &Path) {
        self.locked.lock().unwrap().insert(path.to_path_buf());
    }
}

impl FileOps for LockingFileOps {
    fn is_in_use(&self, path: &Path) -> bool {
        self.locked.lock().unwrap().contains(path)
    }

    fn remove(&self, path: &Path, _mode: DeleteMode) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Records which delete mode each removal asked for
#[derive(Default)]
struct RecordingFileOps {
    modes: Mutex<Vec<DeleteMode>>,
}

impl FileOps for RecordingFileOps {
    fn is_in_use(&self, _path: &Path) -> bool {
        false
    }

    fn remove(&self, path: &Path, mode: DeleteMode) -> io::Result<()> {
        self.modes.lock().unwrap().push(mode);
        fs::remove_file(path)
    }
}

fn write(dir: &Path, name: &str, len: usize) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, vec![0u8; len]).unwrap();
    path
}

fn temp_target(dir: &TempDir) -> CleanupTarget {
    CleanupTarget::new(CleanupCategory::SystemTemp, vec![dir.path().to_path_buf()])
        .with_min_age(Duration::ZERO)
}

#[test]
fn test_locked_file_is_skipped_and_rest_reclaimed() {
    let dir = TempDir::new().unwrap();
    let free = write(dir.path(), "free.tmp", 10 * MB);
    let locked = write(dir.path(), "locked.tmp", 5 * MB);

    let ops = Arc::new(LockingFileOps::default());
    ops.lock(&locked);
    let engine = CleanupEngine::new().with_file_ops(ops);

    let plan = engine.plan(&temp_target(&dir));
    assert_eq!(plan.len(), 2);
    assert_eq!(plan.estimated_reclaim_bytes(), (15 * MB) as u64);

    let report = engine.execute(plan, &CancelFlag::new());
    assert_eq!(report.deleted_count, 1);
    assert_eq!(report.reclaimed_bytes, (10 * MB) as u64);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].path, locked);
    assert_eq!(report.skipped[0].reason, SkipReason::InUse);
    assert!(report.is_partial());

    assert!(!free.exists());
    assert!(locked.exists());
}

#[test]
fn test_files_created_after_planning_are_kept() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "old.tmp", 64);

    let engine = CleanupEngine::new().with_file_ops(Arc::new(LockingFileOps::default()));
    let plan = engine.plan(&temp_target(&dir));
    let newcomer = write(dir.path(), "new.tmp", 64);

    let report = engine.execute(plan, &CancelFlag::new());
    assert_eq!(report.deleted_count, 1);
    assert!(newcomer.exists());
}

#[test]
fn test_externally_deleted_entry_is_not_found() {
    let dir = TempDir::new().unwrap();
    let gone = write(dir.path(), "gone.tmp", 32);
    write(dir.path(), "stays.tmp", 32);

    let engine = CleanupEngine::new().with_file_ops(Arc::new(LockingFileOps::default()));
    let plan = engine.plan(&temp_target(&dir));
    fs::remove_file(&gone).unwrap();

    let report = engine.execute(plan, &CancelFlag::new());
    assert_eq!(report.deleted_count, 1);
    assert_eq!(report.reclaimed_bytes, 32);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, SkipReason::NotFound);
}

#[test]
fn test_modified_entry_is_skipped() {
    let dir = TempDir::new().unwrap();
    let grows = write(dir.path(), "grows.tmp", 16);

    let engine = CleanupEngine::new().with_file_ops(Arc::new(LockingFileOps::default()));
    let plan = engine.plan(&temp_target(&dir));
    fs::write(&grows, vec![1u8; 4096]).unwrap();

    let report = engine.execute(plan, &CancelFlag::new());
    assert_eq!(report.deleted_count, 0);
    assert_eq!(report.skipped[0].reason, SkipReason::ChangedSincePlan);
    assert!(grows.exists());
}

#[test]
fn test_cancel_stops_between_entries() {
    let dir = TempDir::new().unwrap();
    for i in 0..5 {
        write(dir.path(), &format!("f{}.tmp", i), 8);
    }

    let engine = CleanupEngine::new().with_file_ops(Arc::new(LockingFileOps::default()));
    let plan = engine.plan(&temp_target(&dir));
    let cancel = CancelFlag::new();
    let calls = AtomicUsize::new(0);

    let report = engine.execute_with_progress(plan, &cancel, |done, total| {
        assert_eq!(total, 5);
        calls.fetch_add(1, Ordering::SeqCst);
        if done == 2 {
            cancel.cancel();
        }
    });

    assert!(report.cancelled);
    assert_eq!(report.deleted_count, 2);
    assert_eq!(report.not_attempted, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
}

#[test]
fn test_preview_sums_categories() {
    let temp = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    write(temp.path(), "a.tmp", 100);
    write(cache.path(), "b.bin", 300);

    let targets = vec![
        temp_target(&temp),
        CleanupTarget::new(CleanupCategory::BrowserCache, vec![cache.path().to_path_buf()])
            .with_min_age(Duration::ZERO),
    ];
    let preview = CleanupEngine::new().preview(&targets);
    assert_eq!(preview.total_files(), 2);
    assert_eq!(preview.total_bytes(), 400);

    // Preview never deletes
    assert!(temp.path().join("a.tmp").exists());
    assert!(cache.path().join("b.bin").exists());
}

#[test]
fn test_target_delete_mode_reaches_file_ops() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.tmp", 10);
    write(dir.path(), "b.tmp", 10);

    let ops = Arc::new(RecordingFileOps::default());
    let engine = CleanupEngine::new().with_file_ops(ops.clone());
    let plan = engine.plan(&temp_target(&dir).with_delete_mode(DeleteMode::Recoverable));
    let report = engine.execute(plan, &CancelFlag::new());

    assert_eq!(report.deleted_count, 2);
    assert_eq!(
        *ops.modes.lock().unwrap(),
        vec![DeleteMode::Recoverable, DeleteMode::Recoverable]
    );
}

#[cfg(not(windows))]
#[test]
fn test_recoverable_cleanup_moves_files_to_trash() {
    let Some(trash) = fpspack::platform::recycle::trash_files_dir() else {
        return;
    };
    let dir = TempDir::new().unwrap();
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let name = format!("fpspack-cleanup-{}-{}.tmp", std::process::id(), stamp);
    write(dir.path(), &name, 64);

    let engine = CleanupEngine::new();
    let plan = engine.plan(&temp_target(&dir).with_delete_mode(DeleteMode::Recoverable));
    let report = engine.execute(plan, &CancelFlag::new());

    assert_eq!(report.deleted_count, 1);
    assert_eq!(report.reclaimed_bytes, 64);
    assert!(!dir.path().join(&name).exists());

    let landed = trash.join(&name);
    assert_eq!(fs::metadata(&landed).unwrap().len(), 64);
    fs::remove_file(&landed).unwrap();
    if let Some(info) = trash.parent().map(|t| t.join("info")) {
        let _ = fs::remove_file(info.join(format!("{}.trashinfo", name)));
    }
}
