// Registry values as tweak targets
use crate::core::optimizer::TargetApplier;
use crate::core::tweaks::{TargetValue, TweakTarget};
use crate::error::{FpsError, Result};

/// Reads and writes `RegistryValue` targets through winreg
#[derive(Debug, Default, Clone, Copy)]
pub struct RegistryApplier;

#[cfg(windows)]
mod imp {
    use std::io;

    use winreg::enums::*;
    use winreg::RegKey;

    use crate::core::tweaks::{RegistryHive, TargetValue};
    use crate::error::{FpsError, Result};

    fn root(hive: RegistryHive) -> RegKey {
        match hive {
            RegistryHive::CurrentUser => RegKey::predef(HKEY_CURRENT_USER),
            RegistryHive::LocalMachine => RegKey::predef(HKEY_LOCAL_MACHINE),
        }
    }

    fn denied_or(target: &str, e: io::Error, write: bool) -> FpsError {
        if e.kind() == io::ErrorKind::PermissionDenied {
            return FpsError::elevation_required(format!("{} needs administrator rights", target));
        }
        if write {
            FpsError::write_failed(target, e)
        } else {
            FpsError::read_failed(target, e)
        }
    }

    pub fn read(hive: RegistryHive, key: &str, name: &str, label: &str) -> Result<Option<TargetValue>> {
        let subkey = match root(hive).open_subkey_with_flags(key, KEY_READ) {
            Ok(k) => k,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(denied_or(label, e, false)),
        };

        let raw = match subkey.get_raw_value(name) {
            Ok(v) => v,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(denied_or(label, e, false)),
        };

        match raw.vtype {
            REG_DWORD => {
                let value: u32 = subkey.get_value(name).map_err(|e| denied_or(label, e, false))?;
                Ok(Some(TargetValue::Dword(value)))
            }
            REG_SZ | REG_EXPAND_SZ => {
                let value: String = subkey.get_value(name).map_err(|e| denied_or(label, e, false))?;
                Ok(Some(TargetValue::Text(value)))
            }
            other => Err(FpsError::read_failed(
                label,
                format!("unsupported registry type {:?}", other),
            )),
        }
    }

    pub fn write(hive: RegistryHive, key: &str, name: &str, value: &TargetValue, label: &str) -> Result<()> {
        let (subkey, _) = root(hive)
            .create_subkey(key)
            .map_err(|e| denied_or(label, e, true))?;

        let result = match value {
            TargetValue::Dword(v) => subkey.set_value(name, v),
            TargetValue::Text(s) => subkey.set_value(name, s),
        };
        result.map_err(|e| denied_or(label, e, true))
    }

    pub fn remove(hive: RegistryHive, key: &str, name: &str, label: &str) -> Result<()> {
        let subkey = match root(hive).open_subkey_with_flags(key, KEY_SET_VALUE) {
            Ok(k) => k,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(denied_or(label, e, true)),
        };

        match subkey.delete_value(name) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(denied_or(label, e, true)),
        }
    }
}

fn wrong_kind(target: &TweakTarget) -> FpsError {
    FpsError::other(format!("{} is not a registry value", target))
}

impl TargetApplier for RegistryApplier {
    #[cfg(windows)]
    fn read(&self, target: &TweakTarget) -> Result<Option<TargetValue>> {
        match target {
            TweakTarget::RegistryValue { hive, key, value_name } => {
                imp::read(*hive, key, value_name, &target.to_string())
            }
            _ => Err(wrong_kind(target)),
        }
    }

    #[cfg(windows)]
    fn write(&self, target: &TweakTarget, value: &TargetValue) -> Result<()> {
        match target {
            TweakTarget::RegistryValue { hive, key, value_name } => {
                imp::write(*hive, key, value_name, value, &target.to_string())
            }
            _ => Err(wrong_kind(target)),
        }
    }

    #[cfg(windows)]
    fn remove(&self, target: &TweakTarget) -> Result<()> {
        match target {
            TweakTarget::RegistryValue { hive, key, value_name } => {
                imp::remove(*hive, key, value_name, &target.to_string())
            }
            _ => Err(wrong_kind(target)),
        }
    }

    #[cfg(not(windows))]
    fn read(&self, target: &TweakTarget) -> Result<Option<TargetValue>> {
        Err(unsupported(target))
    }

    #[cfg(not(windows))]
    fn write(&self, target: &TweakTarget, _value: &TargetValue) -> Result<()> {
        Err(unsupported(target))
    }

    #[cfg(not(windows))]
    fn remove(&self, target: &TweakTarget) -> Result<()> {
        Err(unsupported(target))
    }
}

#[cfg(not(windows))]
fn unsupported(target: &TweakTarget) -> FpsError {
    match target {
        TweakTarget::RegistryValue { .. } => {
            FpsError::unsupported(format!("{} requires the Windows registry", target))
        }
        _ => wrong_kind(target),
    }
}
