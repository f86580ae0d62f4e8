use std::io;
use thiserror::Error;

/// Custom error type for the fpspack core
#[derive(Error, Debug)]
pub enum FpsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tweak not found: {0}")]
    NotFound(String),

    #[error("No backup found for tweak '{0}'")]
    NoBackupFound(String),

    #[error("Failed to write {target}: {reason}")]
    OsWriteFailed { target: String, reason: String },

    #[error("Failed to read {target}: {reason}")]
    OsReadFailed { target: String, reason: String },

    #[error("Could not enumerate {path}: {reason}")]
    EnumerationFailed { path: String, reason: String },

    #[error("Operation on {target} timed out after {millis} ms")]
    Timeout { target: String, millis: u64 },

    #[error("Not supported on this platform: {0}")]
    Unsupported(String),

    #[error("Backup store error: {0}")]
    Backup(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Elevation required: {0}")]
    ElevationRequired(String),

    #[error("System monitor error: {0}")]
    SystemMonitor(String),

    #[error("Metric collection failed: {0}")]
    MetricCollection(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for the fpspack core
pub type Result<T> = std::result::Result<T, FpsError>;

impl FpsError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        FpsError::Config(msg.into())
    }

    pub fn not_found<S: Into<String>>(id: S) -> Self {
        FpsError::NotFound(id.into())
    }

    pub fn no_backup<S: Into<String>>(id: S) -> Self {
        FpsError::NoBackupFound(id.into())
    }

    /// Create a write failure for the given target
    pub fn write_failed<T: Into<String>, R: ToString>(target: T, reason: R) -> Self {
        FpsError::OsWriteFailed {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a read failure for the given target
    pub fn read_failed<T: Into<String>, R: ToString>(target: T, reason: R) -> Self {
        FpsError::OsReadFailed {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    pub fn enumeration_failed<P: Into<String>, R: ToString>(path: P, reason: R) -> Self {
        FpsError::EnumerationFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        FpsError::Unsupported(msg.into())
    }

    pub fn backup<S: Into<String>>(msg: S) -> Self {
        FpsError::Backup(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied<S: Into<String>>(msg: S) -> Self {
        FpsError::PermissionDenied(msg.into())
    }

    /// Create an invalid path error
    pub fn invalid_path<S: Into<String>>(msg: S) -> Self {
        FpsError::InvalidPath(msg.into())
    }

    /// Create an elevation required error
    pub fn elevation_required<S: Into<String>>(msg: S) -> Self {
        FpsError::ElevationRequired(msg.into())
    }

    pub fn system_monitor<S: Into<String>>(msg: S) -> Self {
        FpsError::SystemMonitor(msg.into())
    }

    pub fn metric_collection<S: Into<String>>(msg: S) -> Self {
        FpsError::MetricCollection(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        FpsError::Other(msg.into())
    }

    /// Whether this failure is a caller error (bad id) rather than an OS fault
    pub fn is_caller_error(&self) -> bool {
        matches!(self, FpsError::NotFound(_) | FpsError::NoBackupFound(_))
    }
}
