use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::file_ops::FileOps;
use super::CleanupTarget;

/// A file selected for deletion, with the identity it had when planned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub last_access_time: Option<SystemTime>,
    pub modified_time: Option<SystemTime>,
}

/// A root or directory that could not be listed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumerationFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Files that a cleanup would remove, computed fresh for one run.
///
/// Consumed by `CleanupEngine::execute`; the entry list cannot be changed
/// after planning.
#[derive(Debug, Clone)]
pub struct CleanupPlan {
    target: CleanupTarget,
    entries: Vec<PlanEntry>,
    estimated_reclaim_bytes: u64,
    enumeration_failures: Vec<EnumerationFailure>,
    excluded_count: usize,
}

impl CleanupPlan {
    pub fn target(&self) -> &CleanupTarget {
        &self.target
    }

    /// Candidates in enumeration order
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn estimated_reclaim_bytes(&self) -> u64 {
        self.estimated_reclaim_bytes
    }

    pub fn enumeration_failures(&self) -> &[EnumerationFailure] {
        &self.enumeration_failures
    }

    /// Files seen but kept by the exclusion rules
    pub fn excluded_count(&self) -> usize {
        self.excluded_count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(super) fn into_parts(self) -> (CleanupTarget, Vec<PlanEntry>, Vec<EnumerationFailure>) {
        (self.target, self.entries, self.enumeration_failures)
    }
}

/// Walks the target's roots and applies its exclusion rules
pub(super) struct Planner<'a> {
    target: &'a CleanupTarget,
    file_ops: &'a dyn FileOps,
    now: SystemTime,
    entries: Vec<PlanEntry>,
    failures: Vec<EnumerationFailure>,
    excluded: usize,
    /// Canonical paths already walked, so overlapping roots count once
    visited: HashSet<PathBuf>,
}

impl<'a> Planner<'a> {
    pub(super) fn new(target: &'a CleanupTarget, file_ops: &'a dyn FileOps) -> Self {
        Self {
            target,
            file_ops,
            now: SystemTime::now(),
            entries: Vec::new(),
            failures: Vec::new(),
            excluded: 0,
            visited: HashSet::new(),
        }
    }

    pub(super) fn run(mut self) -> CleanupPlan {
        for root in &self.target.root_paths {
            match fs::symlink_metadata(root) {
                Ok(meta) if meta.is_dir() => self.walk(root),
                Ok(meta) if meta.is_file() => {
                    if self.first_visit(root) {
                        self.consider(root, &meta);
                    }
                }
                Ok(_) => self.excluded += 1,
                Err(e) => self.fail(root, &e),
            }
        }

        let estimated_reclaim_bytes = self.entries.iter().map(|e| e.size_bytes).sum();
        CleanupPlan {
            target: self.target.clone(),
            entries: self.entries,
            estimated_reclaim_bytes,
            enumeration_failures: self.failures,
            excluded_count: self.excluded,
        }
    }

    fn fail(&mut self, path: &Path, err: &io::Error) {
        log::warn!("Could not enumerate {:?}: {}", path, err);
        self.failures.push(EnumerationFailure {
            path: path.to_path_buf(),
            reason: err.to_string(),
        });
    }

    /// Roots may nest or name the same folder twice (an 8.3 short `%TEMP%`
    /// next to `%LOCALAPPDATA%\Temp`), so identity is the canonical path
    fn first_visit(&mut self, path: &Path) -> bool {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.visited.insert(key)
    }

    /// Recursive walk; symlinks and junctions are never followed
    fn walk(&mut self, dir: &Path) {
        if !self.first_visit(dir) {
            log::debug!("{:?} already covered by another root", dir);
            return;
        }
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.fail(dir, &e);
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let meta = match fs::symlink_metadata(&path) {
                Ok(meta) => meta,
                Err(e) => {
                    log::debug!("Skipping {:?}: {}", path, e);
                    continue;
                }
            };

            if meta.file_type().is_symlink() {
                self.excluded += 1;
            } else if meta.is_dir() {
                if self.target.exclusions.is_protected(&path) {
                    self.excluded += 1;
                } else {
                    self.walk(&path);
                }
            } else if meta.is_file() {
                self.consider(&path, &meta);
            }
        }
    }

    fn consider(&mut self, path: &Path, meta: &fs::Metadata) {
        let rules = &self.target.exclusions;
        let modified = meta.modified().ok();

        let keep = rules.is_protected(path)
            || !rules.accepts_extension(path)
            || !rules.is_old_enough(modified, self.now)
            || (rules.skip_read_only && meta.permissions().readonly())
            || (rules.skip_in_use && self.file_ops.is_in_use(path));

        if keep {
            self.excluded += 1;
            return;
        }

        self.entries.push(PlanEntry {
            path: path.to_path_buf(),
            size_bytes: meta.len(),
            last_access_time: meta.accessed().ok(),
            modified_time: modified,
        });
    }
}
