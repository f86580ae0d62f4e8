use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crate::core::tweaks::{TargetKind, TargetValue, TweakTarget};
use crate::error::{FpsError, Result};
use crate::platform::{RegistryApplier, ServiceApplier, TcpGlobalApplier};

/// Reads and mutates one kind of OS-global state.
///
/// `read` returns `None` when the target does not exist. `remove` restores
/// the "did not exist" state and must succeed when it is already absent.
pub trait TargetApplier: Send + Sync {
    fn read(&self, target: &TweakTarget) -> Result<Option<TargetValue>>;
    fn write(&self, target: &TweakTarget, value: &TargetValue) -> Result<()>;
    fn remove(&self, target: &TweakTarget) -> Result<()>;
}

/// Routes each target to the Windows applier for its kind
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTargets {
    registry: RegistryApplier,
    services: ServiceApplier,
    network: TcpGlobalApplier,
}

impl SystemTargets {
    pub fn new() -> Self {
        Self::default()
    }

    fn route(&self, target: &TweakTarget) -> &dyn TargetApplier {
        match target.kind() {
            TargetKind::RegistryValue => &self.registry,
            TargetKind::ServiceConfig => &self.services,
            TargetKind::NetworkParameter => &self.network,
        }
    }
}

impl TargetApplier for SystemTargets {
    fn read(&self, target: &TweakTarget) -> Result<Option<TargetValue>> {
        self.route(target).read(target)
    }

    fn write(&self, target: &TweakTarget, value: &TargetValue) -> Result<()> {
        self.route(target).write(target, value)
    }

    fn remove(&self, target: &TweakTarget) -> Result<()> {
        self.route(target).remove(target)
    }
}

/// In-process targets for `--simulate` runs and tests.
///
/// Values are keyed by [`TweakTarget::path`]. Writes can be slowed down or
/// made to fail per target, and overlapping writes to one target are detected.
#[derive(Default)]
pub struct InMemoryTargets {
    values: Mutex<HashMap<String, TargetValue>>,
    failing: Mutex<HashSet<String>>,
    write_delay: Mutex<Duration>,
    in_flight: Mutex<HashMap<String, usize>>,
    overlap_seen: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a snapshot taken with [`InMemoryTargets::snapshot`]
    pub fn from_snapshot(values: BTreeMap<String, TargetValue>) -> Self {
        let targets = Self::new();
        targets.values.lock().extend(values);
        targets
    }

    pub fn with_value(self, target: &TweakTarget, value: TargetValue) -> Self {
        self.set(target, value);
        self
    }

    pub fn set(&self, target: &TweakTarget, value: TargetValue) {
        self.values.lock().insert(target.path(), value);
    }

    pub fn get(&self, target: &TweakTarget) -> Option<TargetValue> {
        self.values.lock().get(&target.path()).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, TargetValue> {
        self.values
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Make every later write or remove on `target` fail
    pub fn fail_writes_to(&self, target: &TweakTarget) {
        self.failing.lock().insert(target.path());
    }

    pub fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock() = delay;
    }

    /// Whether two writes to the same target ever ran at the same time
    pub fn overlapping_writes_seen(&self) -> bool {
        self.overlap_seen.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn mutate<F>(&self, target: &TweakTarget, change: F) -> Result<()>
    where
        F: FnOnce(&mut HashMap<String, TargetValue>, String),
    {
        let key = target.path();
        if self.failing.lock().contains(&key) {
            return Err(FpsError::write_failed(target.to_string(), "simulated failure"));
        }

        {
            let mut in_flight = self.in_flight.lock();
            let count = in_flight.entry(key.clone()).or_insert(0);
            if *count > 0 {
                self.overlap_seen.store(true, Ordering::SeqCst);
            }
            *count += 1;
        }

        let delay = *self.write_delay.lock();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        change(&mut self.values.lock(), key.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);

        if let Some(count) = self.in_flight.lock().get_mut(&key) {
            *count -= 1;
        }
        Ok(())
    }
}

impl TargetApplier for InMemoryTargets {
    fn read(&self, target: &TweakTarget) -> Result<Option<TargetValue>> {
        Ok(self.get(target))
    }

    fn write(&self, target: &TweakTarget, value: &TargetValue) -> Result<()> {
        let value = value.clone();
        self.mutate(target, move |values, key| {
            values.insert(key, value);
        })
    }

    fn remove(&self, target: &TweakTarget) -> Result<()> {
        self.mutate(target, |values, key| {
            values.remove(&key);
        })
    }
}
