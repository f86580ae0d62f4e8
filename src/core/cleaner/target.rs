use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::platform::cleanup_dirs;

pub const DEFAULT_MIN_AGE: Duration = Duration::from_secs(24 * 3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupCategory {
    BrowserCache,
    AppTemp,
    SystemTemp,
    RecycleBin,
    SystemCache,
    SystemLogs,
}

impl CleanupCategory {
    pub const ALL: [CleanupCategory; 6] = [
        CleanupCategory::SystemTemp,
        CleanupCategory::AppTemp,
        CleanupCategory::BrowserCache,
        CleanupCategory::SystemCache,
        CleanupCategory::SystemLogs,
        CleanupCategory::RecycleBin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupCategory::BrowserCache => "browser_cache",
            CleanupCategory::AppTemp => "app_temp",
            CleanupCategory::SystemTemp => "system_temp",
            CleanupCategory::RecycleBin => "recycle_bin",
            CleanupCategory::SystemCache => "system_cache",
            CleanupCategory::SystemLogs => "system_logs",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CleanupCategory::BrowserCache => "Browser cache",
            CleanupCategory::AppTemp => "Application temp & shader caches",
            CleanupCategory::SystemTemp => "Temporary files",
            CleanupCategory::RecycleBin => "Recycle Bin",
            CleanupCategory::SystemCache => "System cache",
            CleanupCategory::SystemLogs => "System logs & dumps",
        }
    }

    /// Accepts `system_temp`, `system-temp` and `systemtemp`
    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().replace('_', "") == normalized)
    }

    pub fn default_delete_mode(&self) -> DeleteMode {
        match self {
            CleanupCategory::RecycleBin => DeleteMode::Recoverable,
            _ => DeleteMode::Permanent,
        }
    }

    /// Only these extensions are considered, when set
    pub fn default_extensions(&self) -> Option<Vec<String>> {
        match self {
            CleanupCategory::SystemLogs => Some(vec!["log".into(), "dmp".into(), "tmp".into()]),
            _ => None,
        }
    }

    /// Files in the recycle bin were already deleted by the user, so
    /// there is no reason to wait for them to age.
    pub fn default_min_age(&self) -> Duration {
        match self {
            CleanupCategory::RecycleBin => Duration::ZERO,
            _ => DEFAULT_MIN_AGE,
        }
    }
}

impl fmt::Display for CleanupCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    Permanent,
    /// Routed through the OS recycle facility
    Recoverable,
}

/// Which files planning leaves alone
#[derive(Debug, Clone, PartialEq)]
pub struct ExclusionRules {
    /// Files modified more recently than this are kept
    pub min_age: Duration,
    /// Anything at or below these paths is kept
    pub protected_paths: Vec<PathBuf>,
    /// Lowercase extensions without the dot; `None` accepts every file
    pub extensions: Option<Vec<String>>,
    pub skip_read_only: bool,
    /// Check for open handles while planning, not only before deletion
    pub skip_in_use: bool,
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self {
            min_age: DEFAULT_MIN_AGE,
            protected_paths: Vec::new(),
            extensions: None,
            skip_read_only: true,
            skip_in_use: false,
        }
    }
}

impl ExclusionRules {
    pub fn for_category(category: CleanupCategory) -> Self {
        Self {
            min_age: category.default_min_age(),
            extensions: category.default_extensions(),
            ..Self::default()
        }
    }

    pub fn is_protected(&self, path: &Path) -> bool {
        self.protected_paths
            .iter()
            .any(|protected| path_starts_with(path, protected))
    }

    pub fn accepts_extension(&self, path: &Path) -> bool {
        let Some(allowed) = &self.extensions else {
            return true;
        };
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .map_or(false, |ext| allowed.iter().any(|a| *a == ext))
    }

    /// A modification time in the future counts as brand new
    pub fn is_old_enough(&self, modified: Option<SystemTime>, now: SystemTime) -> bool {
        if self.min_age.is_zero() {
            return true;
        }
        modified
            .and_then(|m| now.duration_since(m).ok())
            .map_or(false, |age| age >= self.min_age)
    }
}

/// Windows paths compare case-insensitively
#[cfg(windows)]
fn path_starts_with(path: &Path, prefix: &Path) -> bool {
    let path = path.to_string_lossy().to_lowercase();
    let prefix = prefix.to_string_lossy().to_lowercase();
    let prefix = prefix.trim_end_matches('\\');
    path == prefix || path.starts_with(&format!("{}\\", prefix))
}

#[cfg(not(windows))]
fn path_starts_with(path: &Path, prefix: &Path) -> bool {
    path.starts_with(prefix)
}

/// A group of locations that are safe to clear
#[derive(Debug, Clone, PartialEq)]
pub struct CleanupTarget {
    pub category: CleanupCategory,
    pub root_paths: Vec<PathBuf>,
    pub exclusions: ExclusionRules,
    pub delete_mode: DeleteMode,
}

impl CleanupTarget {
    pub fn new(category: CleanupCategory, root_paths: Vec<PathBuf>) -> Self {
        Self {
            category,
            root_paths,
            exclusions: ExclusionRules::for_category(category),
            delete_mode: category.default_delete_mode(),
        }
    }

    /// Target over the platform's default locations for `category`
    pub fn system_default(category: CleanupCategory) -> Self {
        Self::new(category, cleanup_dirs::default_roots(category))
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionRules) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_min_age(mut self, min_age: Duration) -> Self {
        self.exclusions.min_age = min_age;
        self
    }

    pub fn with_protected_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.exclusions.protected_paths = paths;
        self
    }

    pub fn with_delete_mode(mut self, mode: DeleteMode) -> Self {
        self.delete_mode = mode;
        self
    }
}
