//! Counter reads behind a trait, so the sampler can run against fakes.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, RefreshKind, System};

use super::metrics::MetricSample;
use crate::error::{FpsError, Result};

/// Raw counter values from one read
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Counters {
    pub cpu_percent: f32,
    pub ram_used_bytes: u64,
    pub ram_total_bytes: u64,
    pub disk_used_bytes: u64,
    pub disk_total_bytes: u64,
}

pub trait CounterSource: Send {
    fn read(&mut self) -> Result<Counters>;
}

/// Which disks count towards the disk figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskScope {
    /// The disk holding the OS (`C:\` or `/`)
    #[default]
    SystemDisk,
    AllDisks,
}

/// Production counters backed by sysinfo
pub struct SysinfoSource {
    system: System,
    disks: Disks,
    scope: DiskScope,
}

impl SysinfoSource {
    pub fn new(scope: DiskScope) -> Self {
        let refresh = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::nothing().with_ram());
        Self {
            system: System::new_with_specifics(refresh),
            disks: Disks::new_with_refreshed_list(),
            scope,
        }
    }

    fn system_mount() -> &'static Path {
        if cfg!(windows) {
            Path::new("C:\\")
        } else {
            Path::new("/")
        }
    }
}

impl CounterSource for SysinfoSource {
    fn read(&mut self) -> Result<Counters> {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        self.disks.refresh(true);

        let ram_total_bytes = self.system.total_memory();
        if ram_total_bytes == 0 {
            return Err(FpsError::metric_collection("memory counters unavailable"));
        }

        let (disk_total_bytes, disk_available) = match self.scope {
            DiskScope::SystemDisk => self
                .disks
                .list()
                .iter()
                .find(|d| d.mount_point() == Self::system_mount())
                .map(|d| (d.total_space(), d.available_space()))
                .ok_or_else(|| FpsError::metric_collection("system disk not found"))?,
            DiskScope::AllDisks => self
                .disks
                .list()
                .iter()
                .fold((0, 0), |(total, avail), d| {
                    (total + d.total_space(), avail + d.available_space())
                }),
        };

        Ok(Counters {
            cpu_percent: self.system.global_cpu_usage().clamp(0.0, 100.0),
            ram_used_bytes: self.system.used_memory(),
            ram_total_bytes,
            disk_used_bytes: disk_total_bytes.saturating_sub(disk_available),
            disk_total_bytes,
        })
    }
}

/// Turns counter reads into samples; never fails
pub struct MetricsSampler {
    source: Box<dyn CounterSource>,
    last: Option<MetricSample>,
    failures: Arc<AtomicU64>,
}

impl MetricsSampler {
    pub fn new(source: Box<dyn CounterSource>) -> Self {
        Self {
            source,
            last: None,
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn system(scope: DiskScope) -> Self {
        Self::new(Box::new(SysinfoSource::new(scope)))
    }

    /// Read the counters. A failed read repeats the previous values with a
    /// fresh timestamp and bumps the failure counter.
    pub fn sample(&mut self) -> MetricSample {
        let sample = match self.source.read() {
            Ok(c) => MetricSample {
                timestamp: chrono::Utc::now(),
                cpu_percent: c.cpu_percent,
                ram_used_bytes: c.ram_used_bytes,
                ram_total_bytes: c.ram_total_bytes,
                disk_used_bytes: c.disk_used_bytes,
                disk_total_bytes: c.disk_total_bytes,
            },
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                log::debug!("Counter read failed, repeating last sample: {}", e);
                self.fallback()
            }
        };
        self.last = Some(sample);
        sample
    }

    pub fn fallback(&self) -> MetricSample {
        self.last
            .map(|s| s.carried_forward())
            .unwrap_or_else(MetricSample::empty)
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Shared handle to the failure counter
    pub fn failure_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.failures)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays scripted reads; `None` entries fail
    pub(crate) struct ScriptedSource(pub VecDeque<Option<Counters>>);

    impl CounterSource for ScriptedSource {
        fn read(&mut self) -> Result<Counters> {
            match self.0.pop_front().flatten() {
                Some(c) => Ok(c),
                None => Err(FpsError::metric_collection("scripted failure")),
            }
        }
    }

    fn counters(cpu: f32) -> Counters {
        Counters {
            cpu_percent: cpu,
            ram_used_bytes: 1,
            ram_total_bytes: 2,
            disk_used_bytes: 3,
            disk_total_bytes: 4,
        }
    }

    #[test]
    fn test_failed_read_reuses_previous_values() {
        let source = ScriptedSource(VecDeque::from(vec![Some(counters(10.0)), None, Some(counters(30.0))]));
        let mut sampler = MetricsSampler::new(Box::new(source));

        let first = sampler.sample();
        let second = sampler.sample();
        let third = sampler.sample();

        assert_eq!(first.cpu_percent, 10.0);
        assert_eq!(second.cpu_percent, 10.0);
        assert_eq!(second.ram_total_bytes, 2);
        assert!(second.timestamp >= first.timestamp);
        assert_eq!(third.cpu_percent, 30.0);
        assert_eq!(sampler.failure_count(), 1);
    }

    #[test]
    fn test_failure_before_first_read_is_empty_sample() {
        let mut sampler = MetricsSampler::new(Box::new(ScriptedSource(VecDeque::new())));
        let sample = sampler.sample();
        assert_eq!(sample.cpu_percent, 0.0);
        assert_eq!(sampler.failure_count(), 1);
    }

    #[test]
    fn test_sysinfo_source_reads_memory() {
        let mut source = SysinfoSource::new(DiskScope::AllDisks);
        let counters = source.read().unwrap();
        assert!(counters.ram_total_bytes > 0);
        assert!(counters.cpu_percent <= 100.0);
    }
}
