//! Flags shared between the reconciliation loop and the UI collaborator
//!
//! The UI side only ever sets these. The loop is the single consumer: it
//! clears the manual trigger when a cycle begins and polls the exit flag
//! once per idle tick and once per completed cycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Manual-trigger and exit flags
///
/// Cloning shares the underlying flags.
#[derive(Debug, Clone, Default)]
pub struct ControlFlags {
    manual_trigger_pending: Arc<AtomicBool>,
    should_exit: Arc<AtomicBool>,
}

impl ControlFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a reconciliation cycle outside the normal cadence
    ///
    /// Latched, not queued: several requests during one cycle collapse into
    /// a single extra cycle.
    pub fn request_manual_check(&self) {
        self.manual_trigger_pending.store(true, Ordering::SeqCst);
    }

    /// Ask the loop to stop at its next idle tick
    pub fn request_exit(&self) {
        self.should_exit.store(true, Ordering::SeqCst);
    }

    /// Whether exit has been requested
    pub fn exit_requested(&self) -> bool {
        self.should_exit.load(Ordering::SeqCst)
    }

    /// Consume a pending manual trigger
    pub(crate) fn take_manual_trigger(&self) -> bool {
        self.manual_trigger_pending.swap(false, Ordering::SeqCst)
    }
}
