//! Threshold alerts for metric samples.
//!
//! Evaluates a sample against configurable warning/critical levels.

use super::metrics::MetricSample;
use serde::{Deserialize, Serialize};

/// Alert configuration with thresholds, all in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub cpu_warning: f32,
    pub cpu_critical: f32,
    pub memory_warning: f32,
    pub memory_critical: f32,
    pub disk_warning: f32,
    pub disk_critical: f32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cpu_warning: 80.0,
            cpu_critical: 95.0,
            memory_warning: 85.0,
            memory_critical: 95.0,
            disk_warning: 90.0,
            disk_critical: 97.0,
        }
    }
}

/// An individual alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub category: AlertCategory,
    pub message: String,
    pub value: f32,
    pub threshold: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertCategory {
    Cpu,
    Memory,
    Disk,
}

impl AlertCategory {
    fn label(self) -> &'static str {
        match self {
            AlertCategory::Cpu => "CPU usage",
            AlertCategory::Memory => "Memory usage",
            AlertCategory::Disk => "Disk usage",
        }
    }
}

/// Evaluate a sample and generate alerts, at most one per category
pub fn evaluate_alerts(sample: &MetricSample, config: &AlertConfig) -> Vec<Alert> {
    let checks = [
        (AlertCategory::Cpu, sample.cpu_percent, config.cpu_warning, config.cpu_critical),
        (
            AlertCategory::Memory,
            sample.ram_percent(),
            config.memory_warning,
            config.memory_critical,
        ),
        (
            AlertCategory::Disk,
            sample.disk_percent(),
            config.disk_warning,
            config.disk_critical,
        ),
    ];

    checks
        .into_iter()
        .filter_map(|(category, value, warning, critical)| {
            let (severity, threshold, level) = if value >= critical {
                (AlertSeverity::Critical, critical, "critical")
            } else if value >= warning {
                (AlertSeverity::Warning, warning, "warning")
            } else {
                return None;
            };
            Some(Alert {
                severity,
                category,
                message: format!(
                    "{} at {:.1}% ({} threshold: {:.1}%)",
                    category.label(),
                    value,
                    level,
                    threshold
                ),
                value,
                threshold,
            })
        })
        .collect()
}
