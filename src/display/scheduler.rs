//! Demand-driven draw scheduling.
//!
//! The render thread is idle unless a frame was pushed or the surface was
//! invalidated; there is no fixed-rate redraw loop.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Wakes the render thread. The production impl forwards to the winit event
/// loop; tests substitute a counting stub.
pub trait RenderWaker: Send + Sync {
    fn wake(&self);
}

/// Dirty-flag coalescing around the waker: `request_draw` wakes at most once
/// per outstanding draw, and `begin_draw` clears the flag on the render
/// thread *before* the pending slot is consumed, so a push racing a draw
/// still produces a follow-up wake. Wakes coalesce; they are never lost.
pub struct RenderScheduler {
    waker: Arc<dyn RenderWaker>,
    dirty: AtomicBool,
    wakes: AtomicU64,
}

impl RenderScheduler {
    pub fn new(waker: Arc<dyn RenderWaker>) -> Self {
        Self {
            waker,
            dirty: AtomicBool::new(false),
            wakes: AtomicU64::new(0),
        }
    }

    /// Called from the processing thread after a push.
    pub fn request_draw(&self) {
        if !self.dirty.swap(true, Ordering::AcqRel) {
            self.wakes.fetch_add(1, Ordering::Relaxed);
            self.waker.wake();
        }
    }

    /// Render thread only. Must run before the slot is taken.
    pub fn begin_draw(&self) {
        self.dirty.store(false, Ordering::Release);
    }

    pub fn wakes(&self) -> u64 {
        self.wakes.load(Ordering::Relaxed)
    }
}
