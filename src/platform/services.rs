// Windows service start modes via sc.exe
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::core::optimizer::TargetApplier;
use crate::core::tweaks::{TargetValue, TweakTarget};
use crate::error::{FpsError, Result};

static START_TYPE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*START_TYPE\s*:\s*(\d+)\s+\w+(?:\s+\((DELAYED)\))?").ok()
});

/// `sc` reports this when the service is not installed
const ERROR_SERVICE_DOES_NOT_EXIST: i32 = 1060;
const ERROR_ACCESS_DENIED: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStartMode {
    Boot,
    System,
    Automatic,
    AutomaticDelayed,
    Manual,
    Disabled,
}

impl ServiceStartMode {
    /// Name used in tweak data and backups
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStartMode::Boot => "Boot",
            ServiceStartMode::System => "System",
            ServiceStartMode::Automatic => "Automatic",
            ServiceStartMode::AutomaticDelayed => "AutomaticDelayed",
            ServiceStartMode::Manual => "Manual",
            ServiceStartMode::Disabled => "Disabled",
        }
    }

    /// Argument for `sc config <name> start= <arg>`
    pub fn sc_argument(&self) -> &'static str {
        match self {
            ServiceStartMode::Boot => "boot",
            ServiceStartMode::System => "system",
            ServiceStartMode::Automatic => "auto",
            ServiceStartMode::AutomaticDelayed => "delayed-auto",
            ServiceStartMode::Manual => "demand",
            ServiceStartMode::Disabled => "disabled",
        }
    }

    /// Accepts both display names and `sc` arguments
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "boot" => Some(ServiceStartMode::Boot),
            "system" => Some(ServiceStartMode::System),
            "automatic" | "auto" => Some(ServiceStartMode::Automatic),
            "automaticdelayed" | "delayed-auto" => Some(ServiceStartMode::AutomaticDelayed),
            "manual" | "demand" => Some(ServiceStartMode::Manual),
            "disabled" => Some(ServiceStartMode::Disabled),
            _ => None,
        }
    }

    /// Extract the start mode from `sc qc` output
    pub fn from_query_output(output: &str) -> Option<Self> {
        let caps = START_TYPE.as_ref()?.captures(output)?;
        let code: u32 = caps.get(1)?.as_str().parse().ok()?;
        let delayed = caps.get(2).is_some();
        match code {
            0 => Some(ServiceStartMode::Boot),
            1 => Some(ServiceStartMode::System),
            2 if delayed => Some(ServiceStartMode::AutomaticDelayed),
            2 => Some(ServiceStartMode::Automatic),
            3 => Some(ServiceStartMode::Manual),
            4 => Some(ServiceStartMode::Disabled),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceStartMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads and writes `ServiceConfig` targets with `sc qc` / `sc config`
#[derive(Debug, Default, Clone, Copy)]
pub struct ServiceApplier;

impl ServiceApplier {
    fn service_name(target: &TweakTarget) -> Result<&str> {
        match target {
            TweakTarget::ServiceConfig { service } => Ok(service),
            _ => Err(FpsError::other(format!("{} is not a service", target))),
        }
    }
}

impl TargetApplier for ServiceApplier {
    fn read(&self, target: &TweakTarget) -> Result<Option<TargetValue>> {
        let service = Self::service_name(target)?;
        ensure_windows(target)?;

        let output = super::process::run_hidden("sc", &["qc", service])
            .map_err(|e| FpsError::read_failed(target.to_string(), e))?;

        if output.status.code() == Some(ERROR_SERVICE_DOES_NOT_EXIST) {
            log::debug!("Service {} is not installed", service);
            return Ok(None);
        }
        if !output.status.success() {
            return Err(FpsError::read_failed(
                target.to_string(),
                super::process::failure_text(&output),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mode = ServiceStartMode::from_query_output(&stdout).ok_or_else(|| {
            FpsError::read_failed(target.to_string(), "no START_TYPE in sc output")
        })?;
        Ok(Some(TargetValue::text(mode.as_str())))
    }

    fn write(&self, target: &TweakTarget, value: &TargetValue) -> Result<()> {
        let service = Self::service_name(target)?;
        let mode = value
            .as_text()
            .and_then(ServiceStartMode::parse)
            .ok_or_else(|| {
                FpsError::write_failed(target.to_string(), format!("{} is not a start mode", value))
            })?;
        ensure_windows(target)?;

        let output =
            super::process::run_hidden("sc", &["config", service, "start=", mode.sc_argument()])
                .map_err(|e| FpsError::write_failed(target.to_string(), e))?;

        match output.status.code() {
            Some(0) => Ok(()),
            Some(ERROR_ACCESS_DENIED) => Err(FpsError::elevation_required(format!(
                "changing {} needs administrator rights",
                target
            ))),
            _ => Err(FpsError::write_failed(
                target.to_string(),
                super::process::failure_text(&output),
            )),
        }
    }

    /// Services cannot be created from a backup; a service that did not
    /// exist before apply has nothing to restore.
    fn remove(&self, target: &TweakTarget) -> Result<()> {
        Self::service_name(target)?;
        Ok(())
    }
}

#[cfg(windows)]
fn ensure_windows(_target: &TweakTarget) -> Result<()> {
    Ok(())
}

#[cfg(not(windows))]
fn ensure_windows(target: &TweakTarget) -> Result<()> {
    Err(FpsError::unsupported(format!("{} requires the Windows service manager", target)))
}
