use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One immutable reading of system load
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    /// 0-100
    pub cpu_percent: f32,
    pub ram_used_bytes: u64,
    pub ram_total_bytes: u64,
    pub disk_used_bytes: u64,
    pub disk_total_bytes: u64,
}

impl MetricSample {
    /// All-zero sample, used before the first successful read
    pub fn empty() -> Self {
        Self {
            timestamp: Utc::now(),
            cpu_percent: 0.0,
            ram_used_bytes: 0,
            ram_total_bytes: 0,
            disk_used_bytes: 0,
            disk_total_bytes: 0,
        }
    }

    /// Same values with a fresh timestamp
    pub fn carried_forward(&self) -> Self {
        Self {
            timestamp: Utc::now(),
            ..*self
        }
    }

    pub fn ram_percent(&self) -> f32 {
        percent(self.ram_used_bytes, self.ram_total_bytes)
    }

    pub fn disk_percent(&self) -> f32 {
        percent(self.disk_used_bytes, self.disk_total_bytes)
    }
}

fn percent(used: u64, total: u64) -> f32 {
    if total == 0 {
        0.0
    } else {
        (used as f64 / total as f64 * 100.0) as f32
    }
}
