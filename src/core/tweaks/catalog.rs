use std::collections::HashMap;

use super::{RegistryHive, RiskClass, TargetValue, Tweak, TweakCategory, TweakTarget};
use crate::error::{FpsError, Result};

const MULTIMEDIA_PROFILE: &str = r"SOFTWARE\Microsoft\Windows NT\CurrentVersion\Multimedia\SystemProfile";

/// Read-only registry of known tweaks
#[derive(Debug, Clone)]
pub struct TweakCatalog {
    tweaks: Vec<Tweak>,
    index: HashMap<String, usize>,
}

impl TweakCatalog {
    /// Build a catalog from tweak data, rejecting duplicate ids
    pub fn new(tweaks: Vec<Tweak>) -> Result<Self> {
        let mut index = HashMap::with_capacity(tweaks.len());
        for (pos, tweak) in tweaks.iter().enumerate() {
            if index.insert(tweak.id.clone(), pos).is_some() {
                return Err(FpsError::config(format!("duplicate tweak id '{}'", tweak.id)));
            }
        }
        Ok(Self { tweaks, index })
    }

    /// The catalog shipped with the application
    pub fn builtin() -> Self {
        let tweaks = builtin_tweaks();
        let index = tweaks
            .iter()
            .enumerate()
            .map(|(pos, t)| (t.id.clone(), pos))
            .collect();
        Self { tweaks, index }
    }

    /// List tweaks, optionally filtered by category, in catalog order
    pub fn list(&self, category: Option<TweakCategory>) -> Vec<&Tweak> {
        self.tweaks
            .iter()
            .filter(|t| category.map_or(true, |c| t.category == c))
            .collect()
    }

    pub fn get(&self, id: &str) -> Result<&Tweak> {
        self.index
            .get(id)
            .map(|&pos| &self.tweaks[pos])
            .ok_or_else(|| FpsError::not_found(id))
    }

    /// Categories that have at least one tweak
    pub fn categories(&self) -> Vec<TweakCategory> {
        let mut categories: Vec<_> = self.tweaks.iter().map(|t| t.category).collect();
        categories.sort();
        categories.dedup();
        categories
    }

    pub fn len(&self) -> usize {
        self.tweaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweaks.is_empty()
    }
}

impl Default for TweakCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn service_tweak(id: &str, name: &str, service: &str, mode: &str, risk: RiskClass) -> Tweak {
    Tweak::new(
        id,
        name,
        TweakCategory::Services,
        TweakTarget::service(service),
        TargetValue::text(mode),
        risk,
    )
}

fn tcp_tweak(id: &str, name: &str, parameter: &str, value: &str, risk: RiskClass) -> Tweak {
    Tweak::new(
        id,
        name,
        TweakCategory::Network,
        TweakTarget::network(parameter),
        TargetValue::text(value),
        risk,
    )
}

fn builtin_tweaks() -> Vec<Tweak> {
    vec![
        // Services
        service_tweak("disable-sysmain-service", "Disable SysMain (Superfetch)", "SysMain", "Disabled", RiskClass::Medium)
            .describe("Stops memory prefetching that competes with games for disk and RAM"),
        service_tweak("manual-themes-service", "Themes service on demand", "Themes", "Manual", RiskClass::Medium),
        service_tweak("manual-print-spooler", "Print Spooler on demand", "Spooler", "Manual", RiskClass::Medium)
            .describe("Printing keeps working; the spooler starts when a job is queued"),
        service_tweak("disable-fax-service", "Disable Fax", "Fax", "Disabled", RiskClass::Low),
        service_tweak("manual-windows-search", "Windows Search on demand", "WSearch", "Manual", RiskClass::Medium)
            .describe("Start menu search becomes slower until the index service is started"),
        service_tweak("manual-tablet-input-service", "Touch keyboard service on demand", "TabletInputService", "Manual", RiskClass::Low),
        service_tweak("manual-biometric-service", "Biometric service on demand", "WbioSrvc", "Manual", RiskClass::High)
            .describe("Windows Hello fingerprint and face sign-in may stop working"),
        service_tweak("disable-wmp-network-service", "Disable WMP network sharing", "WMPNetworkSvc", "Disabled", RiskClass::Low),
        service_tweak("manual-xbox-auth-manager", "Xbox Live auth on demand", "XblAuthManager", "Manual", RiskClass::Low),
        service_tweak("manual-xbox-game-save", "Xbox Live game save on demand", "XblGameSave", "Manual", RiskClass::Low),
        service_tweak("manual-xbox-networking", "Xbox Live networking on demand", "XboxNetApiSvc", "Manual", RiskClass::Low),
        service_tweak("manual-xbox-accessory", "Xbox accessory management on demand", "XboxGipSvc", "Manual", RiskClass::Low),
        Tweak::new(
            "disable-telemetry-service",
            "Disable telemetry service",
            TweakCategory::Privacy,
            TweakTarget::service("DiagTrack"),
            TargetValue::text("Disabled"),
            RiskClass::Low,
        )
        .describe("Connected User Experiences and Telemetry"),
        Tweak::new(
            "disable-telemetry-policy",
            "Minimum telemetry policy",
            TweakCategory::Privacy,
            TweakTarget::registry(
                RegistryHive::LocalMachine,
                r"SOFTWARE\Policies\Microsoft\Windows\DataCollection",
                "AllowTelemetry",
            ),
            TargetValue::Dword(0),
            RiskClass::Medium,
        ),
        // Network
        tcp_tweak("tcp-autotuning-normal", "TCP receive window auto-tuning", "autotuninglevel", "normal", RiskClass::Low),
        tcp_tweak("tcp-rss-enabled", "Receive-side scaling", "rss", "enabled", RiskClass::Low),
        tcp_tweak("tcp-ecn-enabled", "ECN capability", "ecncapability", "enabled", RiskClass::Medium)
            .describe("Some older routers drop ECN-marked packets"),
        tcp_tweak("tcp-timestamps-enabled", "RFC 1323 timestamps", "timestamps", "enabled", RiskClass::Medium),
        Tweak::new(
            "disable-network-throttling",
            "Disable multimedia network throttling",
            TweakCategory::Network,
            TweakTarget::registry(RegistryHive::LocalMachine, MULTIMEDIA_PROFILE, "NetworkThrottlingIndex"),
            TargetValue::Dword(0xffff_ffff),
            RiskClass::Medium,
        ),
        // Gaming
        Tweak::new(
            "system-responsiveness-gaming",
            "Reserve less CPU for background multimedia",
            TweakCategory::Gaming,
            TweakTarget::registry(RegistryHive::LocalMachine, MULTIMEDIA_PROFILE, "SystemResponsiveness"),
            TargetValue::Dword(10),
            RiskClass::Low,
        ),
        Tweak::new(
            "disable-game-dvr",
            "Disable Game DVR background recording",
            TweakCategory::Gaming,
            TweakTarget::registry(RegistryHive::CurrentUser, r"System\GameConfigStore", "GameDVR_Enabled"),
            TargetValue::Dword(0),
            RiskClass::Low,
        ),
        Tweak::new(
            "enable-game-mode",
            "Enable Windows Game Mode",
            TweakCategory::Gaming,
            TweakTarget::registry(RegistryHive::CurrentUser, r"Software\Microsoft\GameBar", "AutoGameModeEnabled"),
            TargetValue::Dword(1),
            RiskClass::Low,
        ),
        Tweak::new(
            "gpu-hardware-scheduling",
            "Hardware-accelerated GPU scheduling",
            TweakCategory::Gaming,
            TweakTarget::registry(
                RegistryHive::LocalMachine,
                r"SYSTEM\CurrentControlSet\Control\GraphicsDrivers",
                "HwSchMode",
            ),
            TargetValue::Dword(2),
            RiskClass::High,
        )
        .describe("Requires a reboot and a driver that supports it"),
        // Visual
        Tweak::new(
            "visual-effects-performance",
            "Adjust visual effects for best performance",
            TweakCategory::Visual,
            TweakTarget::registry(
                RegistryHive::CurrentUser,
                r"Software\Microsoft\Windows\CurrentVersion\Explorer\VisualEffects",
                "VisualFXSetting",
            ),
            TargetValue::Dword(2),
            RiskClass::Low,
        ),
        Tweak::new(
            "reduce-menu-show-delay",
            "Faster menu animations",
            TweakCategory::Visual,
            TweakTarget::registry(RegistryHive::CurrentUser, r"Control Panel\Desktop", "MenuShowDelay"),
            TargetValue::text("100"),
            RiskClass::Low,
        ),
    ]
}
