//! Activation state shared between the detector and in-flight resolutions.
//!
//! A bare "enabled" boolean checked at async resumption points leaves a
//! window where a resolution dispatched before `deactivate` keeps running
//! into a later activation. The gate closes that window with a generation
//! counter: each resolution holds a [`LiveToken`] pinned to the generation it
//! was dispatched under, and `deactivate` bumps the generation, so stale
//! tokens never report live again.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Default)]
struct GateState {
    active: AtomicBool,
    generation: AtomicU64,
}

#[derive(Debug, Clone, Default)]
pub struct ActivationGate {
    inner: Arc<GateState>,
}

impl ActivationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch the gate on. Returns `false` if it was already active, so
    /// callers can keep activation idempotent.
    pub fn activate(&self) -> bool {
        !self.inner.active.swap(true, Ordering::SeqCst)
    }

    /// Switch the gate off and invalidate every outstanding token. Returns
    /// `false` if it was already inactive.
    pub fn deactivate(&self) -> bool {
        if self.inner.active.swap(false, Ordering::SeqCst) {
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Capture a token for work dispatched under the current generation.
    pub fn token(&self) -> LiveToken {
        LiveToken {
            inner: Arc::clone(&self.inner),
            generation: self.inner.generation.load(Ordering::SeqCst),
        }
    }
}

/// Checked at every suspension point of a resolution; goes permanently dead
/// once the gate deactivates.
#[derive(Debug, Clone)]
pub struct LiveToken {
    inner: Arc<GateState>,
    generation: u64,
}

impl LiveToken {
    pub fn is_live(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
            && self.inner.generation.load(Ordering::SeqCst) == self.generation
    }
}
