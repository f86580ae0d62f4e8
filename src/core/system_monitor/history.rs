use std::collections::VecDeque;

use super::metrics::MetricSample;

const DEFAULT_HISTORY_SIZE: usize = 60;

/// Circular buffer of recent usage percentages
#[derive(Debug, Clone)]
pub struct MetricsHistory {
    capacity: usize,
    pub cpu_usage: VecDeque<f32>,
    pub memory_usage: VecDeque<f32>,
    pub disk_usage: VecDeque<f32>,
}

impl MetricsHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            cpu_usage: VecDeque::with_capacity(capacity),
            memory_usage: VecDeque::with_capacity(capacity),
            disk_usage: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, sample: &MetricSample) {
        let capacity = self.capacity;
        Self::push_value(&mut self.cpu_usage, sample.cpu_percent, capacity);
        Self::push_value(&mut self.memory_usage, sample.ram_percent(), capacity);
        Self::push_value(&mut self.disk_usage, sample.disk_percent(), capacity);
    }

    fn push_value(queue: &mut VecDeque<f32>, value: f32, capacity: usize) {
        if queue.len() >= capacity {
            queue.pop_front();
        }
        queue.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.cpu_usage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpu_usage.is_empty()
    }

    pub fn average_cpu(&self) -> Option<f32> {
        average(&self.cpu_usage)
    }

    pub fn average_memory(&self) -> Option<f32> {
        average(&self.memory_usage)
    }

    pub fn peak_cpu(&self) -> Option<f32> {
        self.cpu_usage.iter().copied().reduce(f32::max)
    }
}

impl Default for MetricsHistory {
    fn default() -> Self {
        Self::new()
    }
}

fn average(values: &VecDeque<f32>) -> Option<f32> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }
}
