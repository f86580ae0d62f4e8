// Core functionality module

pub mod activity;
pub mod backup;
pub mod cancel;
pub mod cleaner;
pub mod config;
pub mod optimizer;
pub mod panel;
pub mod system_monitor;
pub mod turbo;
pub mod tweaks;

// Re-exports for cleaner imports
pub use activity::{ActivityEvent, EventSink, FanoutSink, JsonlSink, LogSink, RecentEvents, Severity};
pub use backup::{ApplicationStatus, BackupRecord, BackupStore, BackupToken, PreviousValue};
pub use cancel::CancelFlag;
pub use cleaner::{CleanupCategory, CleanupEngine, CleanupPlan, CleanupReport, CleanupTarget};
pub use config::Settings;
pub use optimizer::{ApplyOutcome, OptimizationEngine, RevertOutcome, TweakState, TweakStatus};
pub use panel::{Panel, TargetMode};
pub use turbo::{ItemOutcome, TurboOrchestrator, TurboPolicy, TurboSelection, TurboSession};
pub use tweaks::{RiskClass, Tweak, TweakCatalog, TweakCategory};
