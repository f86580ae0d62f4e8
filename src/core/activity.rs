//! Structured activity events.
//!
//! Every apply, revert, cleanup and failure produces an [`ActivityEvent`].
//! Where the events end up (the `log` facade, an append-only JSONL file, an
//! in-memory buffer for the presentation layer) is decided by the
//! [`EventSink`] handed to the engines.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    fn level(&self) -> log::Level {
        match self {
            Severity::Debug => log::Level::Debug,
            Severity::Info => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Error => log::Level::Error,
        }
    }
}

/// One structured event emitted by a core component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub timestamp: DateTime<Utc>,
    pub component: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

impl ActivityEvent {
    pub fn new<C: Into<String>, M: Into<String>>(component: C, severity: Severity, message: M) -> Self {
        Self {
            timestamp: Utc::now(),
            component: component.into(),
            severity,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn info<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::new(component, Severity::Info, message)
    }

    pub fn warning<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::new(component, Severity::Warning, message)
    }

    pub fn error<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::new(component, Severity::Error, message)
    }

    /// Attach a context key/value pair
    pub fn with<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }
}

/// Destination for activity events. Implementations must never panic.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &ActivityEvent);
}

/// Forwards events to the `log` facade, using the component as log target
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &ActivityEvent) {
        let target = format!("fpspack::{}", event.component);
        if event.context.is_empty() {
            log::log!(target: target.as_str(), event.severity.level(), "{}", event.message);
        } else {
            let context: Vec<String> = event
                .context
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            log::log!(
                target: target.as_str(),
                event.severity.level(),
                "{} [{}]",
                event.message,
                context.join(" ")
            );
        }
    }
}

/// Append-only JSON lines file, one self-contained object per line
pub struct JsonlSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlSink {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for JsonlSink {
    fn emit(&self, event: &ActivityEvent) {
        let mut line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                log::warn!("Failed to serialize activity event: {}", e);
                return;
            }
        };
        line.push('\n');

        // One write_all per line keeps concurrent tails from seeing partial lines
        let mut file = self.file.lock();
        if let Err(e) = file.write_all(line.as_bytes()) {
            log::warn!("Failed to append to {:?}: {}", self.path, e);
        }
    }
}

/// Keeps the most recent events in memory for display
pub struct RecentEvents {
    capacity: usize,
    events: Mutex<VecDeque<ActivityEvent>>,
}

impl RecentEvents {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    pub fn snapshot(&self) -> Vec<ActivityEvent> {
        self.events.lock().iter().cloned().collect()
    }
}

impl EventSink for RecentEvents {
    fn emit(&self, event: &ActivityEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

/// Sends every event to each inner sink in order
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: &ActivityEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
