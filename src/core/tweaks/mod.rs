//! Declarative tweak definitions.
//!
//! A [`Tweak`] is pure data: which OS target it touches, the value it wants
//! there and how risky the change is. The optimizer interprets the target
//! through a small set of appliers, so adding a tweak never touches engine code.

mod catalog;

pub use catalog::TweakCatalog;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse safety rating gating automatic selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskClass {
    Low,
    Medium,
    High,
}

impl RiskClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskClass::Low => "low",
            RiskClass::Medium => "medium",
            RiskClass::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Some(RiskClass::Low),
            "medium" => Some(RiskClass::Medium),
            "high" => Some(RiskClass::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TweakCategory {
    Services,
    Network,
    Gaming,
    Visual,
    Privacy,
}

impl TweakCategory {
    pub const ALL: [TweakCategory; 5] = [
        TweakCategory::Services,
        TweakCategory::Network,
        TweakCategory::Gaming,
        TweakCategory::Visual,
        TweakCategory::Privacy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TweakCategory::Services => "services",
            TweakCategory::Network => "network",
            TweakCategory::Gaming => "gaming",
            TweakCategory::Visual => "visual",
            TweakCategory::Privacy => "privacy",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == value)
    }
}

impl fmt::Display for TweakCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistryHive {
    CurrentUser,
    LocalMachine,
}

impl RegistryHive {
    pub fn short_name(&self) -> &'static str {
        match self {
            RegistryHive::CurrentUser => "HKCU",
            RegistryHive::LocalMachine => "HKLM",
        }
    }
}

/// Kind of OS-global state a tweak mutates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    RegistryValue,
    ServiceConfig,
    NetworkParameter,
}

/// The concrete OS location a tweak writes to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TweakTarget {
    RegistryValue {
        hive: RegistryHive,
        key: String,
        value_name: String,
    },
    /// Start mode of a Windows service
    ServiceConfig { service: String },
    /// Global TCP parameter as understood by `netsh int tcp set global`
    NetworkParameter { parameter: String },
}

impl TweakTarget {
    pub fn registry(hive: RegistryHive, key: &str, value_name: &str) -> Self {
        TweakTarget::RegistryValue {
            hive,
            key: key.to_string(),
            value_name: value_name.to_string(),
        }
    }

    pub fn service(service: &str) -> Self {
        TweakTarget::ServiceConfig {
            service: service.to_string(),
        }
    }

    pub fn network(parameter: &str) -> Self {
        TweakTarget::NetworkParameter {
            parameter: parameter.to_string(),
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            TweakTarget::RegistryValue { .. } => TargetKind::RegistryValue,
            TweakTarget::ServiceConfig { .. } => TargetKind::ServiceConfig,
            TweakTarget::NetworkParameter { .. } => TargetKind::NetworkParameter,
        }
    }

    /// Stable identity of the target, used as the lock key.
    ///
    /// Registry and service names are case-insensitive on Windows, so the
    /// identity is lowercased to make `SysMain` and `sysmain` share a lock.
    pub fn path(&self) -> String {
        let raw = match self {
            TweakTarget::RegistryValue {
                hive,
                key,
                value_name,
            } => format!("{}\\{}\\{}", hive.short_name(), key, value_name),
            TweakTarget::ServiceConfig { service } => format!("service:{}", service),
            TweakTarget::NetworkParameter { parameter } => format!("tcp:{}", parameter),
        };
        raw.to_lowercase()
    }
}

impl fmt::Display for TweakTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TweakTarget::RegistryValue {
                hive,
                key,
                value_name,
            } => write!(f, "{}\\{} [{}]", hive.short_name(), key, value_name),
            TweakTarget::ServiceConfig { service } => write!(f, "service {}", service),
            TweakTarget::NetworkParameter { parameter } => write!(f, "tcp global {}", parameter),
        }
    }
}

/// A typed value stored at a tweak target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TargetValue {
    Dword(u32),
    Text(String),
}

impl TargetValue {
    pub fn text<S: Into<String>>(value: S) -> Self {
        TargetValue::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TargetValue::Text(s) => Some(s),
            TargetValue::Dword(_) => None,
        }
    }

    /// Compare ignoring ASCII case for textual values (`Enabled` == `enabled`)
    pub fn matches(&self, other: &TargetValue) -> bool {
        match (self, other) {
            (TargetValue::Dword(a), TargetValue::Dword(b)) => a == b,
            (TargetValue::Text(a), TargetValue::Text(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }
}

impl fmt::Display for TargetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetValue::Dword(v) => write!(f, "{} (0x{:x})", v, v),
            TargetValue::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// A single reversible system configuration change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweak {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: TweakCategory,
    pub target: TweakTarget,
    pub desired: TargetValue,
    pub risk: RiskClass,
}

impl Tweak {
    pub fn new(
        id: &str,
        name: &str,
        category: TweakCategory,
        target: TweakTarget,
        desired: TargetValue,
        risk: RiskClass,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            category,
            target,
            desired,
            risk,
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}
