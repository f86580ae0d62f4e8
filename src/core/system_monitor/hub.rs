//! Fan-out of metric samples to any number of subscribers.
//!
//! Each subscriber owns a bounded queue. Publishing never waits on a
//! subscriber: when a queue is full its oldest sample is discarded and that
//! subscriber's drop counter goes up. Other subscribers are unaffected.

use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::metrics::MetricSample;

pub const DEFAULT_QUEUE_BOUND: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

struct SubscriberQueue {
    capacity: usize,
    samples: Mutex<VecDeque<MetricSample>>,
    dropped: AtomicU64,
    closed: AtomicBool,
    notify: Notify,
}

impl SubscriberQueue {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    fn push(&self, sample: MetricSample) {
        {
            let mut samples = self.samples.lock();
            if samples.len() >= self.capacity {
                samples.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            samples.push_back(sample);
        }
        self.notify.notify_one();
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    queues: BTreeMap<SubscriptionId, Arc<SubscriberQueue>>,
}

/// Cloneable handle to one broadcast hub
#[derive(Clone, Default)]
pub struct MonitorHub {
    registry: Arc<Mutex<Registry>>,
}

impl MonitorHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber whose queue holds at most `capacity` samples
    pub fn subscribe(&self, capacity: usize) -> Subscription {
        let queue = Arc::new(SubscriberQueue::new(capacity.max(1)));
        let mut registry = self.registry.lock();
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry.queues.insert(id, Arc::clone(&queue));
        log::debug!("Monitor subscriber {:?} registered (bound {})", id, queue.capacity);

        Subscription {
            id,
            queue,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Remove a subscriber. Samples already queued can still be read.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        remove(&self.registry, id)
    }

    /// Deliver to every subscriber, in subscription order
    pub fn publish(&self, sample: MetricSample) {
        let registry = self.registry.lock();
        for queue in registry.queues.values() {
            queue.push(sample);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().queues.len()
    }

    /// Run `callback` for every sample on its own task.
    ///
    /// The callback is fed from a bounded queue like any other subscriber,
    /// so a slow callback only loses its own oldest samples.
    pub fn spawn_observer<F>(&self, capacity: usize, mut callback: F) -> ObserverHandle
    where
        F: FnMut(MetricSample) + Send + 'static,
    {
        let subscription = self.subscribe(capacity);
        let id = subscription.id();
        let task = tokio::spawn(async move {
            while let Some(sample) = subscription.recv().await {
                callback(sample);
            }
        });
        ObserverHandle {
            id,
            hub: self.clone(),
            task,
        }
    }
}

fn remove(registry: &Mutex<Registry>, id: SubscriptionId) -> bool {
    match registry.lock().queues.remove(&id) {
        Some(queue) => {
            queue.close();
            log::debug!("Monitor subscriber {:?} removed", id);
            true
        }
        None => false,
    }
}

/// Receiving end of one subscriber queue. Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriptionId,
    queue: Arc<SubscriberQueue>,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn try_recv(&self) -> Option<MetricSample> {
        self.queue.samples.lock().pop_front()
    }

    /// Everything queued, oldest first
    pub fn drain(&self) -> Vec<MetricSample> {
        self.queue.samples.lock().drain(..).collect()
    }

    /// Wait for the next sample. Returns `None` once unsubscribed and empty.
    pub async fn recv(&self) -> Option<MetricSample> {
        loop {
            if let Some(sample) = self.try_recv() {
                return Some(sample);
            }
            if self.queue.closed.load(Ordering::SeqCst) {
                return None;
            }
            self.queue.notify.notified().await;
        }
    }

    /// Samples discarded because this subscriber fell behind
    pub fn dropped_count(&self) -> u64 {
        self.queue.dropped.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.queue.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            remove(&registry, self.id);
        }
    }
}

pub struct ObserverHandle {
    id: SubscriptionId,
    hub: MonitorHub,
    task: JoinHandle<()>,
}

impl ObserverHandle {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Unsubscribe and wait for the callback task to finish what it has queued
    pub async fn stop(self) {
        self.hub.unsubscribe(self.id);
        if let Err(e) = self.task.await {
            log::warn!("Monitor observer task ended abnormally: {}", e);
        }
    }
}
