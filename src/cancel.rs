//! Cooperative cancellation shared between the walk and the check tasks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A one-way flag: once cancelled, always cancelled. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    flag: Arc<AtomicBool>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
