// Platform-specific filesystem checks used by the cleanup engine
use std::io;
use std::path::Path;

#[cfg(windows)]
const ERROR_SHARING_VIOLATION: i32 = 32;
#[cfg(windows)]
const ERROR_LOCK_VIOLATION: i32 = 33;

/// Whether an I/O error means another process holds the file
#[cfg(windows)]
pub fn is_sharing_violation(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(ERROR_SHARING_VIOLATION) | Some(ERROR_LOCK_VIOLATION)
    )
}

#[cfg(not(windows))]
pub fn is_sharing_violation(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::ETXTBSY)
}

/// Whether another process currently has the file open without sharing.
///
/// Opening with an exclusive share mode fails with a sharing violation
/// while any other handle is open.
#[cfg(windows)]
pub fn is_in_use(path: &Path) -> bool {
    use std::fs::OpenOptions;
    use std::os::windows::fs::OpenOptionsExt;

    match OpenOptions::new().read(true).write(true).share_mode(0).open(path) {
        Ok(_) => false,
        Err(e) => is_sharing_violation(&e),
    }
}

/// Unix has no mandatory locks: an open file can always be unlinked.
#[cfg(not(windows))]
pub fn is_in_use(_path: &Path) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unopened_file_is_not_in_use() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("idle.tmp");
        std::fs::write(&path, b"x").unwrap();
        assert!(!is_in_use(&path));
    }

    #[test]
    fn test_not_found_is_not_a_sharing_violation() {
        let err = io::Error::from(io::ErrorKind::NotFound);
        assert!(!is_sharing_violation(&err));
    }
}
