//! User settings, stored as `settings.json` in the platform config directory.
//!
//! Loading never fails: a missing document yields defaults, and an unreadable
//! or corrupt one yields defaults plus a warning.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::cleaner::{CleanupCategory, CleanupTarget, DeleteMode};
use crate::core::system_monitor::{AlertConfig, DiskScope, MIN_INTERVAL};
use crate::core::tweaks::{Tweak, TweakCategory};
use crate::core::turbo::TurboPolicy;
use crate::error::{FpsError, Result};
use crate::platform::cleanup_dirs;

const APP_DIR: &str = "fpspack";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    pub interval_ms: u64,
    /// Samples each subscriber may fall behind before the oldest are dropped
    pub queue_bound: usize,
    pub disk_scope: DiskScope,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            queue_bound: 16,
            disk_scope: DiskScope::SystemDisk,
        }
    }
}

impl MonitoringSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationSettings {
    pub enabled_categories: Vec<TweakCategory>,
    pub mutation_timeout_secs: u64,
}

impl Default for OptimizationSettings {
    fn default() -> Self {
        Self {
            enabled_categories: TweakCategory::ALL.to_vec(),
            mutation_timeout_secs: 30,
        }
    }
}

impl OptimizationSettings {
    pub fn mutation_timeout(&self) -> Duration {
        Duration::from_secs(self.mutation_timeout_secs)
    }

    pub fn allows(&self, tweak: &Tweak) -> bool {
        self.enabled_categories.contains(&tweak.category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupSettings {
    /// Files younger than this are never planned. Does not apply to the
    /// recycle bin, whose contents the user already discarded.
    pub min_file_age_hours: u64,
    pub protected_paths: Vec<PathBuf>,
    pub enabled_categories: Vec<CleanupCategory>,
    /// Extra roots per category
    pub custom_paths: BTreeMap<CleanupCategory, Vec<PathBuf>>,
    /// Default roots the user removed
    pub excluded_default_paths: Vec<PathBuf>,
    /// Per-category override of how files are removed, e.g. sending temp
    /// files to the recycle bin instead of deleting them
    pub delete_modes: BTreeMap<CleanupCategory, DeleteMode>,
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            min_file_age_hours: 24,
            protected_paths: Vec::new(),
            enabled_categories: CleanupCategory::ALL.to_vec(),
            custom_paths: BTreeMap::new(),
            excluded_default_paths: Vec::new(),
            delete_modes: BTreeMap::new(),
        }
    }
}

impl CleanupSettings {
    /// Default roots minus exclusions, plus custom roots
    pub fn roots(&self, category: CleanupCategory) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = cleanup_dirs::default_roots(category)
            .into_iter()
            .filter(|root| !self.excluded_default_paths.contains(root))
            .collect();

        if let Some(custom) = self.custom_paths.get(&category) {
            for path in custom {
                if !roots.contains(path) {
                    roots.push(path.clone());
                }
            }
        }
        roots
    }

    /// Cleanup target for `category` with these settings applied
    pub fn target(&self, category: CleanupCategory) -> CleanupTarget {
        let mut target = CleanupTarget::new(category, self.roots(category))
            .with_protected_paths(self.protected_paths.clone());
        if category != CleanupCategory::RecycleBin {
            let min_age = Duration::from_secs(self.min_file_age_hours.saturating_mul(3600));
            target = target.with_min_age(min_age);
        }
        if let Some(mode) = self.delete_modes.get(&category) {
            target = target.with_delete_mode(*mode);
        }
        target
    }

    pub fn enabled_targets(&self) -> Vec<CleanupTarget> {
        self.enabled_categories
            .iter()
            .map(|c| self.target(*c))
            .collect()
    }

    pub fn add_custom_path(&mut self, category: CleanupCategory, path: PathBuf) -> bool {
        let paths = self.custom_paths.entry(category).or_default();
        if paths.contains(&path) {
            return false;
        }
        paths.push(path);
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub monitoring: MonitoringSettings,
    pub optimization: OptimizationSettings,
    pub cleanup: CleanupSettings,
    pub turbo: TurboPolicy,
    pub alerts: AlertConfig,
    /// Where backups and session records live; platform data dir when unset
    pub data_dir: Option<PathBuf>,
}

impl Settings {
    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                log::warn!("{}; using default settings", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No settings at {:?}, using defaults", path);
            return Self::default();
        }

        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Could not read settings {:?}: {}; using defaults", path, e);
                return Self::default();
            }
        };

        if data.iter().all(|b| b.is_ascii_whitespace()) {
            return Self::default();
        }

        match serde_json::from_slice::<Settings>(&data) {
            Ok(settings) => settings.clamped(),
            Err(e) => {
                log::warn!("Settings {:?} are corrupt: {}; using defaults", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data)?;
        log::debug!("Saved settings to {:?}", path);
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| FpsError::config("Could not determine config directory"))?;
        Ok(config_dir.join(APP_DIR).join("settings.json"))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| FpsError::config("Could not determine data directory"))?;
        Ok(data_dir.join(APP_DIR))
    }

    pub fn backups_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("backups.json"))
    }

    /// Record of the most recent Turbo session, for deactivation
    pub fn session_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("turbo_session.json"))
    }

    /// Target values kept between `--simulate` runs
    pub fn simulation_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("simulation.json"))
    }

    pub fn activity_log_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("activity.jsonl"))
    }

    /// Raise out-of-range values to their minimum
    pub fn clamped(mut self) -> Self {
        let min_interval = MIN_INTERVAL.as_millis() as u64;
        if self.monitoring.interval_ms < min_interval {
            log::warn!(
                "Monitoring interval {} ms is below {} ms, clamping",
                self.monitoring.interval_ms,
                min_interval
            );
            self.monitoring.interval_ms = min_interval;
        }
        self.monitoring.queue_bound = self.monitoring.queue_bound.max(1);
        self.optimization.mutation_timeout_secs = self.optimization.mutation_timeout_secs.max(1);
        self
    }
}
