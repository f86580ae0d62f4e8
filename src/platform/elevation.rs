//! Administrator privilege detection.
//!
//! Registry writes under HKLM, service reconfiguration and TCP global
//! parameters all need an elevated token on Windows.

use crate::error::{FpsError, Result};

#[cfg(windows)]
pub fn is_elevated() -> bool {
    use std::mem;
    use std::ptr;
    use winapi::ctypes::c_void;
    use winapi::um::handleapi::CloseHandle;
    use winapi::um::processthreadsapi::{GetCurrentProcess, OpenProcessToken};
    use winapi::um::securitybaseapi::GetTokenInformation;
    use winapi::um::winnt::{TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY};

    // SAFETY: the token handle is checked before use and closed on every path
    unsafe {
        let mut token: *mut c_void = ptr::null_mut();
        if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) == 0 {
            return false;
        }

        let mut elevation: TOKEN_ELEVATION = mem::zeroed();
        let mut returned: u32 = 0;
        let ok = GetTokenInformation(
            token,
            TokenElevation,
            &mut elevation as *mut _ as *mut c_void,
            mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut returned,
        );
        CloseHandle(token);

        ok != 0 && elevation.TokenIsElevated != 0
    }
}

#[cfg(not(windows))]
pub fn is_elevated() -> bool {
    // SAFETY: geteuid has no preconditions
    unsafe { libc::geteuid() == 0 }
}

/// Short label for status output
pub fn privilege_label() -> &'static str {
    if is_elevated() {
        "administrator"
    } else {
        "standard user"
    }
}

/// Fail early with `ElevationRequired` when `action` cannot succeed unelevated
pub fn require_elevation(action: &str) -> Result<()> {
    if is_elevated() {
        Ok(())
    } else {
        Err(FpsError::elevation_required(format!(
            "{} needs administrator privileges",
            action
        )))
    }
}
