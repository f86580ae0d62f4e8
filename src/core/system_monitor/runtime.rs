//! Background sampling loop.
//!
//! One tokio task owns the tick schedule. Each counter read runs on the
//! blocking pool and gets at most one interval to finish; the task then
//! publishes the sample to the hub and to a `watch` channel holding the most
//! recent value.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::hub::MonitorHub;
use super::metrics::MetricSample;
use super::sampler::MetricsSampler;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

pub struct MonitorRuntime {
    latest_rx: watch::Receiver<MetricSample>,
    failures: Arc<AtomicU64>,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl MonitorRuntime {
    /// Start sampling on the current tokio runtime.
    ///
    /// Intervals below [`MIN_INTERVAL`] are raised to it.
    pub fn spawn(sampler: MetricsSampler, hub: MonitorHub, interval: Duration) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        let failures = sampler.failure_counter();
        let (latest_tx, latest_rx) = watch::channel(MetricSample::empty());
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

        let task = tokio::spawn(sampling_task(
            Arc::new(Mutex::new(sampler)),
            hub,
            interval,
            latest_tx,
            Arc::clone(&failures),
            shutdown_rx,
        ));

        log::info!("Monitor started ({} ms interval)", interval.as_millis());

        Self {
            latest_rx,
            failures,
            shutdown_tx,
            task,
        }
    }

    pub fn latest(&self) -> MetricSample {
        *self.latest_rx.borrow()
    }

    /// Receiver that always holds the newest sample
    pub fn watch(&self) -> watch::Receiver<MetricSample> {
        self.latest_rx.clone()
    }

    /// Transient read failures so far, including reads abandoned for
    /// exceeding the interval
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Stop ticking and wait for the loop to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            log::warn!("Monitor task ended abnormally: {}", e);
        }
        log::info!("Monitor stopped");
    }
}

async fn sampling_task(
    sampler: Arc<Mutex<MetricsSampler>>,
    hub: MonitorHub,
    interval: Duration,
    latest_tx: watch::Sender<MetricSample>,
    failures: Arc<AtomicU64>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last: Option<MetricSample> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let sample = match read_once(&sampler, interval).await {
                    Some(sample) => sample,
                    None => {
                        failures.fetch_add(1, Ordering::Relaxed);
                        last.map(|s| s.carried_forward()).unwrap_or_else(MetricSample::empty)
                    }
                };
                last = Some(sample);
                // watch::send only fails without receivers, and we hold one
                let _ = latest_tx.send(sample);
                hub.publish(sample);
            }
            _ = shutdown.recv() => {
                log::debug!("Monitor task shutting down");
                break;
            }
        }
    }
}

/// `None` when the previous read still holds the sampler or this one overran
async fn read_once(sampler: &Arc<Mutex<MetricsSampler>>, budget: Duration) -> Option<MetricSample> {
    let Some(mut guard) = sampler.try_lock_arc() else {
        log::debug!("Previous counter read still running, skipping tick");
        return None;
    };

    let job = tokio::task::spawn_blocking(move || guard.sample());
    match tokio::time::timeout(budget, job).await {
        Ok(Ok(sample)) => Some(sample),
        Ok(Err(e)) => {
            log::warn!("Counter read task failed: {}", e);
            None
        }
        Err(_) => {
            log::debug!("Counter read exceeded {} ms", budget.as_millis());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::system_monitor::sampler::tests::ScriptedSource;
    use crate::core::system_monitor::sampler::{CounterSource, Counters};
    use crate::error::Result;
    use std::collections::VecDeque;

    fn counters(cpu: f32) -> Counters {
        Counters {
            cpu_percent: cpu,
            ram_used_bytes: 8,
            ram_total_bytes: 16,
            disk_used_bytes: 50,
            disk_total_bytes: 100,
        }
    }

    struct SlowSource(Duration);

    impl CounterSource for SlowSource {
        fn read(&mut self) -> Result<Counters> {
            std::thread::sleep(self.0);
            Ok(counters(99.0))
        }
    }

    #[tokio::test]
    async fn test_samples_reach_hub_in_order() {
        let hub = MonitorHub::new();
        let sub = hub.subscribe(16);
        let source = ScriptedSource(VecDeque::from(vec![
            Some(counters(10.0)),
            Some(counters(20.0)),
            Some(counters(30.0)),
        ]));

        let runtime = MonitorRuntime::spawn(
            MetricsSampler::new(Box::new(source)),
            hub.clone(),
            Duration::from_millis(200),
        );

        let mut seen = Vec::new();
        for _ in 0..3 {
            let sample = tokio::time::timeout(Duration::from_secs(5), sub.recv())
                .await
                .unwrap()
                .unwrap();
            seen.push(sample.cpu_percent);
        }
        let latest = runtime.latest();
        runtime.shutdown().await;

        assert_eq!(seen, vec![10.0, 20.0, 30.0]);
        assert_eq!(latest.ram_total_bytes, 16);
    }

    #[tokio::test]
    async fn test_overrunning_read_counts_as_failure() {
        let hub = MonitorHub::new();
        let sub = hub.subscribe(64);
        let runtime = MonitorRuntime::spawn(
            MetricsSampler::new(Box::new(SlowSource(Duration::from_millis(450)))),
            hub.clone(),
            Duration::from_millis(100),
        );

        tokio::time::sleep(Duration::from_millis(600)).await;
        let failures = runtime.failure_count();
        runtime.shutdown().await;

        assert!(failures >= 1);
        assert!(!sub.drain().is_empty());
    }

    #[tokio::test]
    async fn test_interval_is_clamped() {
        let hub = MonitorHub::new();
        let source = ScriptedSource(VecDeque::from(vec![Some(counters(1.0))]));
        let runtime = MonitorRuntime::spawn(
            MetricsSampler::new(Box::new(source)),
            hub,
            Duration::from_millis(1),
        );
        let mut rx = runtime.watch();
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        runtime.shutdown().await;
    }
}
