//! Echo gate: keeps the assistant from hearing itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared count of active speakers.
///
/// The microphone discards incoming samples while any speaker holds the
/// gate, so playback is never transcribed as a new command. Overlapping
/// speech (a reminder during a reply) keeps it closed until both finish.
#[derive(Debug, Clone, Default)]
pub struct EchoGate {
    holders: Arc<AtomicUsize>,
}

impl EchoGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_speaking(&self) {
        let holders = self.holders.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(holders, "Echo gate: speaking, mic gated");
    }

    pub fn stop_speaking(&self) {
        let previous = self
            .holders
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        if previous <= 1 {
            tracing::debug!("Echo gate: silent, mic open");
        }
    }

    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.holders.load(Ordering::SeqCst) > 0
    }

    /// Hold the gate until the returned guard drops.
    #[must_use]
    pub fn hold(&self) -> GateGuard {
        self.start_speaking();
        GateGuard { gate: self.clone() }
    }
}

/// Clears the gate on drop, including on early return or panic.
#[derive(Debug)]
pub struct GateGuard {
    gate: EchoGate,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.gate.stop_speaking();
    }
}
