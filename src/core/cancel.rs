use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "stop issuing new work" signal.
///
/// Work already started runs to completion; checks happen between items.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
