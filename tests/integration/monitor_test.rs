// Monitor runtime and hub fan-out

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use fpspack::core::system_monitor::{
    evaluate_alerts, AlertCategory, AlertConfig, AlertSeverity, CounterSource, Counters, MetricSample,
    MetricsHistory, MetricsSampler, MonitorHub, MonitorRuntime,
};
use fpspack::Result;

/// Reports 1%, 2%, 3%... CPU, failing every read listed in `fail_on`
struct CounterStep {
    reads: Arc<AtomicU32>,
    fail_on: Vec<u32>,
}

impl CounterSource for CounterStep {
    fn read(&mut self) -> Result<Counters> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&n) {
            return Err(fpspack::FpsError::metric_collection("counter unavailable"));
        }
        Ok(Counters {
            cpu_percent: n as f32,
            ram_used_bytes: 4 * 1024,
            ram_total_bytes: 8 * 1024,
            disk_used_bytes: 10,
            disk_total_bytes: 100,
        })
    }
}

fn sampler(fail_on: Vec<u32>) -> (MetricsSampler, Arc<AtomicU32>) {
    let reads = Arc::new(AtomicU32::new(0));
    let source = CounterStep {
        reads: Arc::clone(&reads),
        fail_on,
    };
    (MetricsSampler::new(Box::new(source)), reads)
}

fn sample(cpu: f32, ram: u64, disk: u64) -> MetricSample {
    MetricSample {
        cpu_percent: cpu,
        ram_used_bytes: ram,
        ram_total_bytes: 100,
        disk_used_bytes: disk,
        disk_total_bytes: 100,
        ..MetricSample::empty()
    }
}

#[tokio::test]
async fn test_runtime_publishes_to_every_subscriber() {
    let hub = MonitorHub::new();
    let first = hub.subscribe(8);
    let second = hub.subscribe(8);
    let (sampler, _) = sampler(Vec::new());

    let runtime = MonitorRuntime::spawn(sampler, hub.clone(), Duration::from_millis(100));

    for _ in 0..3 {
        let a = timeout(Duration::from_secs(5), first.recv()).await.unwrap().unwrap();
        let b = timeout(Duration::from_secs(5), second.recv()).await.unwrap().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.ram_percent(), 50.0);
    }
    assert!(runtime.latest().cpu_percent >= 3.0);

    runtime.shutdown().await;
    assert_eq!(hub.subscriber_count(), 2);
}

#[tokio::test]
async fn test_failed_read_carries_previous_sample_forward() {
    let hub = MonitorHub::new();
    let subscription = hub.subscribe(8);
    let (sampler, _) = sampler(vec![2]);

    let runtime = MonitorRuntime::spawn(sampler, hub.clone(), Duration::from_millis(100));

    let mut seen = Vec::new();
    for _ in 0..3 {
        let sample = timeout(Duration::from_secs(5), subscription.recv())
            .await
            .unwrap()
            .unwrap();
        seen.push(sample);
    }
    runtime.shutdown().await;

    assert_eq!(seen[0].cpu_percent, 1.0);
    assert_eq!(seen[1].cpu_percent, 1.0);
    assert!(seen[1].timestamp >= seen[0].timestamp);
    assert_eq!(seen[2].cpu_percent, 3.0);
}

#[tokio::test]
async fn test_interval_below_minimum_is_raised() {
    let hub = MonitorHub::new();
    let (sampler, reads) = sampler(Vec::new());

    let runtime = MonitorRuntime::spawn(sampler, hub, Duration::from_millis(1));
    tokio::time::sleep(Duration::from_millis(350)).await;
    runtime.shutdown().await;

    // First tick fires immediately, then at most every 100 ms
    assert!(reads.load(Ordering::SeqCst) <= 5);
}

#[test]
fn test_slow_subscriber_loses_oldest_only() {
    let hub = MonitorHub::new();
    let slow = hub.subscribe(3);
    let fast = hub.subscribe(16);

    for i in 0..8 {
        hub.publish(sample(i as f32, 0, 0));
    }

    let kept: Vec<f32> = slow.drain().iter().map(|s| s.cpu_percent).collect();
    assert_eq!(kept, vec![5.0, 6.0, 7.0]);
    assert_eq!(slow.dropped_count(), 5);
    assert_eq!(fast.drain().len(), 8);
    assert_eq!(fast.dropped_count(), 0);
}

#[test]
fn test_alerts_and_history_from_samples() {
    let config = AlertConfig::default();
    let calm = sample(20.0, 40, 50);
    let busy = sample(97.0, 90, 98);

    assert!(evaluate_alerts(&calm, &config).is_empty());

    let alerts = evaluate_alerts(&busy, &config);
    assert_eq!(alerts.len(), 3);
    let cpu = alerts.iter().find(|a| a.category == AlertCategory::Cpu).unwrap();
    assert_eq!(cpu.severity, AlertSeverity::Critical);
    let memory = alerts.iter().find(|a| a.category == AlertCategory::Memory).unwrap();
    assert_eq!(memory.severity, AlertSeverity::Warning);

    let mut history = MetricsHistory::new();
    history.push(&calm);
    history.push(&busy);
    assert_eq!(history.len(), 2);
    assert_eq!(history.peak_cpu(), Some(97.0));
    assert_eq!(history.average_memory(), Some(65.0));
}
