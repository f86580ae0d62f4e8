// Global TCP parameters via netsh
use crate::core::optimizer::TargetApplier;
use crate::core::tweaks::{TargetValue, TweakTarget};
use crate::error::{FpsError, Result};

/// `netsh int tcp set global` parameter names and the labels
/// `netsh int tcp show global` prints for them (English locale)
const PARAMETER_LABELS: &[(&str, &str)] = &[
    ("autotuninglevel", "Receive Window Auto-Tuning Level"),
    ("rss", "Receive-Side Scaling State"),
    ("ecncapability", "ECN Capability"),
    ("timestamps", "RFC 1323 Timestamps"),
    ("initialrto", "Initial RTO"),
    ("rsc", "Receive Segment Coalescing State"),
    ("nonsackrttresiliency", "Non Sack Rtt Resiliency"),
    ("maxsynretransmissions", "Max SYN Retransmissions"),
    ("fastopen", "Fast Open"),
    ("fastopenfallback", "Fast Open Fallback"),
    ("hystart", "HyStart"),
    ("pacingprofile", "Pacing Profile"),
];

pub fn label_for(parameter: &str) -> Option<&'static str> {
    let parameter = parameter.to_lowercase();
    PARAMETER_LABELS
        .iter()
        .find(|(name, _)| *name == parameter)
        .map(|(_, label)| *label)
}

/// Find the value printed for `label` in `netsh int tcp show global` output
pub fn parse_global_value(output: &str, label: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case(label) {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}

/// Reads and writes `NetworkParameter` targets
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpGlobalApplier;

impl TcpGlobalApplier {
    fn parameter(target: &TweakTarget) -> Result<&str> {
        match target {
            TweakTarget::NetworkParameter { parameter } => Ok(parameter),
            _ => Err(FpsError::other(format!("{} is not a TCP parameter", target))),
        }
    }
}

impl TargetApplier for TcpGlobalApplier {
    fn read(&self, target: &TweakTarget) -> Result<Option<TargetValue>> {
        let parameter = Self::parameter(target)?;
        let label = label_for(parameter).ok_or_else(|| {
            FpsError::read_failed(target.to_string(), "unknown TCP global parameter")
        })?;
        ensure_windows(target)?;

        let output = super::process::run_hidden("netsh", &["int", "tcp", "show", "global"])
            .map_err(|e| FpsError::read_failed(target.to_string(), e))?;
        if !output.status.success() {
            return Err(FpsError::read_failed(
                target.to_string(),
                super::process::failure_text(&output),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_global_value(&stdout, label).map(TargetValue::Text))
    }

    fn write(&self, target: &TweakTarget, value: &TargetValue) -> Result<()> {
        let parameter = Self::parameter(target)?;
        let assignment = match value {
            TargetValue::Text(v) => format!("{}={}", parameter, v),
            TargetValue::Dword(v) => format!("{}={}", parameter, v),
        };
        ensure_windows(target)?;

        let output =
            super::process::run_hidden("netsh", &["int", "tcp", "set", "global", &assignment])
                .map_err(|e| FpsError::write_failed(target.to_string(), e))?;

        if output.status.success() {
            Ok(())
        } else {
            let reason = super::process::failure_text(&output);
            if reason.to_lowercase().contains("elevation") {
                Err(FpsError::elevation_required(format!(
                    "changing {} needs administrator rights",
                    target
                )))
            } else {
                Err(FpsError::write_failed(target.to_string(), reason))
            }
        }
    }

    /// Global TCP parameters always exist, so there is nothing to delete.
    fn remove(&self, target: &TweakTarget) -> Result<()> {
        Err(FpsError::unsupported(format!("{} cannot be removed", target)))
    }
}

#[cfg(windows)]
fn ensure_windows(_target: &TweakTarget) -> Result<()> {
    Ok(())
}

#[cfg(not(windows))]
fn ensure_windows(target: &TweakTarget) -> Result<()> {
    Err(FpsError::unsupported(format!("{} requires netsh", target)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOW_GLOBAL: &str = "Querying active state...

TCP Global Parameters
----------------------------------------------
Receive-Side Scaling State          : enabled
Receive Window Auto-Tuning Level    : normal
Add-On Congestion Control Provider  : default
ECN Capability                      : disabled
RFC 1323 Timestamps                 : allowed
Initial RTO                         : 1000
";

    #[test]
    fn test_parse_known_parameters() {
        assert_eq!(
            parse_global_value(SHOW_GLOBAL, label_for("rss").unwrap()).as_deref(),
            Some("enabled")
        );
        assert_eq!(
            parse_global_value(SHOW_GLOBAL, label_for("ecncapability").unwrap()).as_deref(),
            Some("disabled")
        );
        assert_eq!(
            parse_global_value(SHOW_GLOBAL, label_for("initialrto").unwrap()).as_deref(),
            Some("1000")
        );
    }

    #[test]
    fn test_missing_label_is_none() {
        assert_eq!(parse_global_value(SHOW_GLOBAL, "Fast Open"), None);
    }

    #[test]
    fn test_label_lookup_ignores_case() {
        assert_eq!(label_for("AutoTuningLevel"), Some("Receive Window Auto-Tuning Level"));
        assert_eq!(label_for("chimney"), None);
    }
}
