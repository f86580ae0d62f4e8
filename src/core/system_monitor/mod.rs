//! Live system load monitoring.
//!
//! A sampler reads CPU, memory and disk counters, a runtime task drives it on
//! a fixed interval, and a hub fans each sample out to subscribers.

pub mod alerts;
mod history;
mod hub;
mod metrics;
mod runtime;
mod sampler;

pub use alerts::{evaluate_alerts, Alert, AlertCategory, AlertConfig, AlertSeverity};
pub use history::MetricsHistory;
pub use hub::{MonitorHub, ObserverHandle, Subscription, SubscriptionId, DEFAULT_QUEUE_BOUND};
pub use metrics::MetricSample;
pub use runtime::{MonitorRuntime, DEFAULT_INTERVAL, MIN_INTERVAL};
pub use sampler::{CounterSource, Counters, DiskScope, MetricsSampler, SysinfoSource};
