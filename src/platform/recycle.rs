// Recoverable deletion through the OS recycle facility
use std::io;
use std::path::{Path, PathBuf};

/// Move a file to the Recycle Bin (or the XDG trash).
///
/// Entries already inside the recycle bin cannot be recycled again and are
/// removed permanently, which is how the bin itself gets emptied.
pub fn move_to_recycle_bin(path: &Path) -> io::Result<()> {
    if is_inside_recycle_bin(path) {
        return std::fs::remove_file(path);
    }
    recycle(path)
}

#[cfg(windows)]
pub fn is_inside_recycle_bin(path: &Path) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_string_lossy()
            .eq_ignore_ascii_case("$Recycle.Bin")
    })
}

#[cfg(not(windows))]
pub fn is_inside_recycle_bin(path: &Path) -> bool {
    trash_files_dir().map_or(false, |trash| path.starts_with(trash))
}

#[cfg(windows)]
fn recycle(path: &Path) -> io::Result<()> {
    use std::mem;
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::UI::Shell::{
        SHFileOperationW, FOF_ALLOWUNDO, FOF_NOCONFIRMATION, FOF_NOERRORUI, FOF_SILENT, FO_DELETE,
        SHFILEOPSTRUCTW,
    };

    // pFrom is a list of NUL-terminated paths ending with an extra NUL
    let mut from: Vec<u16> = path.as_os_str().encode_wide().collect();
    from.push(0);
    from.push(0);

    let result = unsafe {
        let mut op: SHFILEOPSTRUCTW = mem::zeroed();
        op.wFunc = FO_DELETE as _;
        op.pFrom = from.as_ptr();
        op.fFlags = (FOF_ALLOWUNDO | FOF_NOCONFIRMATION | FOF_NOERRORUI | FOF_SILENT) as _;
        let code = SHFileOperationW(&mut op);
        if code == 0 && op.fAnyOperationsAborted != 0 {
            -1
        } else {
            code
        }
    };

    match result {
        0 => Ok(()),
        -1 => Err(io::Error::new(io::ErrorKind::Interrupted, "recycle operation aborted")),
        code => Err(io::Error::other(format!("SHFileOperationW failed with {:#x}", code))),
    }
}

#[cfg(not(windows))]
fn recycle(path: &Path) -> io::Result<()> {
    let files = trash_files_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no trash directory"))?;
    recycle_into(path, &files).map(|_| ())
}

/// Move `path` into an XDG trash `files` directory and write its
/// `.trashinfo` next door so file managers can restore it
#[cfg(not(windows))]
fn recycle_into(path: &Path, files: &Path) -> io::Result<PathBuf> {
    use std::fs;

    let info = files
        .parent()
        .map(|trash| trash.join("info"))
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "trash has no parent"))?;
    fs::create_dir_all(files)?;
    fs::create_dir_all(&info)?;

    let name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?
        .to_string_lossy()
        .into_owned();

    let mut trashed_name = name.clone();
    let mut n = 1;
    while files.join(&trashed_name).exists()
        || info.join(format!("{}.trashinfo", trashed_name)).exists()
    {
        trashed_name = format!("{}.{}", name, n);
        n += 1;
    }

    let original = fs::canonicalize(path)?;
    fs::write(
        info.join(format!("{}.trashinfo", trashed_name)),
        format!(
            "[Trash Info]\nPath={}\nDeletionDate={}\n",
            original.display(),
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S")
        ),
    )?;

    let destination = files.join(&trashed_name);
    match fs::rename(path, &destination) {
        Ok(()) => {}
        Err(e) if crosses_devices(&e) => {
            fs::copy(path, &destination)?;
            fs::remove_file(path)?;
        }
        Err(e) => {
            let _ = fs::remove_file(info.join(format!("{}.trashinfo", trashed_name)));
            return Err(e);
        }
    }
    Ok(destination)
}

#[cfg(unix)]
fn crosses_devices(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EXDEV)
}

#[cfg(all(not(unix), not(windows)))]
fn crosses_devices(_err: &io::Error) -> bool {
    false
}

/// XDG trash `files` directory
#[cfg(not(windows))]
pub fn trash_files_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("Trash").join("files"))
}

#[cfg(windows)]
pub fn trash_files_dir() -> Option<PathBuf> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(windows)]
    #[test]
    fn test_recycle_bin_detection() {
        assert!(is_inside_recycle_bin(Path::new(r"C:\$Recycle.Bin\S-1-5-21\$RABC.txt")));
        assert!(!is_inside_recycle_bin(Path::new(r"C:\Users\a\file.txt")));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_recycle_into_writes_trash_info_and_avoids_collisions() {
        let dir = tempfile::TempDir::new().unwrap();
        let files = dir.path().join("Trash").join("files");
        let source = dir.path().join("work");
        std::fs::create_dir_all(&source).unwrap();

        let first = source.join("report.log");
        std::fs::write(&first, b"one").unwrap();
        let landed = recycle_into(&first, &files).unwrap();
        assert_eq!(landed, files.join("report.log"));
        assert!(!first.exists());

        std::fs::write(&first, b"two").unwrap();
        let second = recycle_into(&first, &files).unwrap();
        assert_eq!(second, files.join("report.log.1"));
        assert_eq!(std::fs::read(&second).unwrap(), b"two");

        let info = std::fs::read_to_string(
            dir.path().join("Trash").join("info").join("report.log.1.trashinfo"),
        )
        .unwrap();
        assert!(info.starts_with("[Trash Info]\n"));
        assert!(info.contains("report.log"));
        assert!(info.contains("DeletionDate="));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_move_to_recycle_bin_lands_in_user_trash() {
        let Some(files) = trash_files_dir() else {
            return;
        };
        let dir = tempfile::TempDir::new().unwrap();
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let name = format!("fpspack-recycle-{}-{}.tmp", std::process::id(), stamp);
        let path = dir.path().join(&name);
        std::fs::write(&path, b"recoverable").unwrap();

        move_to_recycle_bin(&path).unwrap();
        assert!(!path.exists());

        let landed = files.join(&name);
        assert_eq!(std::fs::read(&landed).unwrap(), b"recoverable");

        // Emptying the bin removes for real
        assert!(is_inside_recycle_bin(&landed));
        move_to_recycle_bin(&landed).unwrap();
        assert!(!landed.exists());
        let info = files.parent().unwrap().join("info");
        let _ = std::fs::remove_file(info.join(format!("{}.trashinfo", name)));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_trash_detection() {
        if let Some(trash) = trash_files_dir() {
            assert!(is_inside_recycle_bin(&trash.join("old.txt")));
        }
        assert!(!is_inside_recycle_bin(Path::new("/definitely/elsewhere.txt")));
    }
}
