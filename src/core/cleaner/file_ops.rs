use std::fs;
use std::io;
use std::path::Path;

use super::DeleteMode;
use crate::platform::{fs as platform_fs, recycle};

/// Lock checks and deletion, behind a trait so tests can simulate
/// files held open by another process.
pub trait FileOps: Send + Sync {
    fn is_in_use(&self, path: &Path) -> bool;
    fn remove(&self, path: &Path, mode: DeleteMode) -> io::Result<()>;

    /// Whether a failed removal means the file is held open
    fn is_in_use_error(&self, err: &io::Error) -> bool {
        platform_fs::is_sharing_violation(err)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileOps;

impl FileOps for OsFileOps {
    fn is_in_use(&self, path: &Path) -> bool {
        platform_fs::is_in_use(path)
    }

    fn remove(&self, path: &Path, mode: DeleteMode) -> io::Result<()> {
        match mode {
            DeleteMode::Permanent => fs::remove_file(path),
            DeleteMode::Recoverable => recycle::move_to_recycle_bin(path),
        }
    }
}
