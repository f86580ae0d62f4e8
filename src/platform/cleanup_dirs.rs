// Default locations for each cleanup category
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::cleaner::CleanupCategory;

/// Existing default roots for a category, deduplicated
pub fn default_roots(category: CleanupCategory) -> Vec<PathBuf> {
    let mut roots = match category {
        CleanupCategory::SystemTemp => system_temp_roots(),
        CleanupCategory::AppTemp => app_temp_roots(),
        CleanupCategory::BrowserCache => browser_cache_roots(),
        CleanupCategory::SystemCache => system_cache_roots(),
        CleanupCategory::SystemLogs => system_log_roots(),
        CleanupCategory::RecycleBin => recycle_bin_roots(),
    };

    roots.retain(|p| p.exists());
    roots.sort();
    roots.dedup();
    roots
}

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(windows)]
fn under(var: &str, parts: &[&str]) -> Option<PathBuf> {
    env_path(var).map(|base| parts.iter().fold(base, |p, part| p.join(part)))
}

#[cfg(windows)]
fn windows_dir() -> PathBuf {
    env_path("SystemRoot")
        .or_else(|| env_path("WINDIR"))
        .unwrap_or_else(|| PathBuf::from(r"C:\Windows"))
}

#[cfg(windows)]
fn system_temp_roots() -> Vec<PathBuf> {
    [
        env_path("TEMP"),
        env_path("TMP"),
        Some(windows_dir().join("Temp")),
        under("LOCALAPPDATA", &["Temp"]),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(unix)]
fn system_temp_roots() -> Vec<PathBuf> {
    let mut roots = vec![PathBuf::from("/tmp")];
    if let Some(tmpdir) = env_path("TMPDIR") {
        roots.push(tmpdir);
    }
    roots
}

#[cfg(windows)]
fn app_temp_roots() -> Vec<PathBuf> {
    [
        under("LOCALAPPDATA", &["D3DSCache"]),
        under("LOCALAPPDATA", &["NVIDIA", "DXCache"]),
        under("LOCALAPPDATA", &["NVIDIA", "GLCache"]),
        under("LOCALAPPDATA", &["AMD", "DxCache"]),
        under("LOCALAPPDATA", &["AMD", "GLCache"]),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(unix)]
fn app_temp_roots() -> Vec<PathBuf> {
    dirs::cache_dir()
        .map(|cache| vec![cache.join("thumbnails"), cache.join("mesa_shader_cache")])
        .unwrap_or_default()
}

#[cfg(windows)]
fn browser_cache_roots() -> Vec<PathBuf> {
    let chromium_profiles: [&[&str]; 4] = [
        &["Google", "Chrome", "User Data", "Default"],
        &["Microsoft", "Edge", "User Data", "Default"],
        &["BraveSoftware", "Brave-Browser", "User Data", "Default"],
        &["Opera Software", "Opera Stable"],
    ];

    let mut roots = Vec::new();
    for profile in chromium_profiles {
        let base = if profile[0] == "Opera Software" {
            under("APPDATA", profile)
        } else {
            under("LOCALAPPDATA", profile)
        };
        if let Some(base) = base {
            roots.push(base.join("Cache"));
            roots.push(base.join("Code Cache"));
            roots.push(base.join("GPUCache"));
        }
    }

    if let Some(profiles) = under("LOCALAPPDATA", &["Mozilla", "Firefox", "Profiles"]) {
        roots.extend(firefox_caches(&profiles));
    }
    roots
}

#[cfg(unix)]
fn browser_cache_roots() -> Vec<PathBuf> {
    let Some(cache) = dirs::cache_dir() else {
        return Vec::new();
    };
    let mut roots = vec![
        cache.join("google-chrome").join("Default").join("Cache"),
        cache.join("chromium").join("Default").join("Cache"),
        cache.join("BraveSoftware").join("Brave-Browser").join("Default").join("Cache"),
        cache.join("microsoft-edge").join("Default").join("Cache"),
    ];
    roots.extend(firefox_caches(&cache.join("mozilla").join("firefox")));
    roots
}

/// `cache2` folder of every Firefox profile under `profiles`
fn firefox_caches(profiles: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(profiles) else {
        return Vec::new();
    };
    entries
        .flatten()
        .map(|entry| entry.path().join("cache2"))
        .filter(|p| p.is_dir())
        .collect()
}

#[cfg(windows)]
fn system_cache_roots() -> Vec<PathBuf> {
    // Prefetch is left alone: it speeds up application start
    [
        Some(windows_dir().join("SoftwareDistribution").join("Download")),
        under("LOCALAPPDATA", &["Microsoft", "Windows", "INetCache"]),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(unix)]
fn system_cache_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("/var/cache/apt/archives")]
}

#[cfg(windows)]
fn system_log_roots() -> Vec<PathBuf> {
    let windir = windows_dir();
    [
        Some(windir.join("Logs")),
        Some(windir.join("Debug")),
        Some(windir.join("Minidump")),
        under("LOCALAPPDATA", &["CrashDumps"]),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(unix)]
fn system_log_roots() -> Vec<PathBuf> {
    dirs::cache_dir()
        .map(|cache| vec![cache.join("logs")])
        .unwrap_or_default()
}

/// Per-drive Recycle Bin folders on Windows, the XDG trash elsewhere
#[cfg(windows)]
pub fn recycle_bin_roots() -> Vec<PathBuf> {
    (b'C'..=b'Z')
        .map(|drive| PathBuf::from(format!("{}:\\$Recycle.Bin", drive as char)))
        .filter(|p| p.exists())
        .collect()
}

#[cfg(unix)]
pub fn recycle_bin_roots() -> Vec<PathBuf> {
    super::recycle::trash_files_dir().into_iter().collect()
}

/// Name of the browser owning a cache path, for reporting
pub fn identify_browser(path: &Path) -> Option<&'static str> {
    let lower = path.to_string_lossy().to_lowercase();
    const BROWSERS: &[(&str, &str)] = &[
        ("brave", "Brave"),
        ("edge", "Microsoft Edge"),
        ("opera", "Opera"),
        ("firefox", "Firefox"),
        ("chromium", "Chromium"),
        ("chrome", "Google Chrome"),
    ];
    BROWSERS
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, name)| *name)
}
