//! Cooperative interruption of generations.
//!
//! Every submitted generation gets an epoch. `interrupt()` marks all epochs
//! submitted so far as stopped, so an interrupt that races ahead of a queued
//! generation still applies to it, while later generations start clean.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct Epochs {
    /// Highest epoch handed out
    submitted: AtomicU64,
    /// Every epoch <= this value must stop
    interrupted: AtomicU64,
}

/// Shared between the worker's intake and executor; never leaves the worker.
#[derive(Debug, Clone, Default)]
pub struct InterruptRegistry {
    epochs: Arc<Epochs>,
}

impl InterruptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the epoch for a newly submitted generation
    pub fn submit(&self) -> u64 {
        self.epochs.submitted.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Stop every generation submitted so far. Returns false when there was none.
    pub fn interrupt(&self) -> bool {
        let submitted = self.epochs.submitted.load(Ordering::Acquire);
        let previous = self.epochs.interrupted.fetch_max(submitted, Ordering::AcqRel);
        previous < submitted
    }

    pub fn signal(&self, epoch: u64) -> StopSignal {
        StopSignal { epoch, epochs: Some(self.epochs.clone()) }
    }
}

/// Handed to `Engine::generate`; checked between generation steps
#[derive(Debug, Clone)]
pub struct StopSignal {
    epoch: u64,
    epochs: Option<Arc<Epochs>>,
}

impl StopSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        Self { epoch: 0, epochs: None }
    }

    pub fn should_stop(&self) -> bool {
        match &self.epochs {
            Some(epochs) => self.epoch > 0 && epochs.interrupted.load(Ordering::Acquire) >= self.epoch,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupt_without_generation_is_noop() {
        let reg = InterruptRegistry::new();
        assert!(!reg.interrupt());
        let epoch = reg.submit();
        assert!(!reg.signal(epoch).should_stop());
    }

    #[test]
    fn interrupt_applies_to_queued_generation() {
        let reg = InterruptRegistry::new();
        let epoch = reg.submit();
        assert!(reg.interrupt());
        assert!(reg.signal(epoch).should_stop());
        // idempotent
        assert!(!reg.interrupt());
    }

    #[test]
    fn later_generation_starts_clean() {
        let reg = InterruptRegistry::new();
        let first = reg.submit();
        reg.interrupt();
        let second = reg.submit();
        assert!(reg.signal(first).should_stop());
        assert!(!reg.signal(second).should_stop());
    }

    #[test]
    fn never_signal() {
        assert!(!StopSignal::never().should_stop());
    }
}
