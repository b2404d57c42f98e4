//! Bounded accounting for in-flight device frames.
//!
//! The capture device recycles a small fixed set of buffers; a frame that is
//! never released stalls future captures. Tickets are RAII so release is a
//! hard guarantee, not a best-effort cleanup.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::PipelineError;

#[derive(Debug)]
struct PoolInner {
    capacity: usize,
    in_flight: AtomicUsize,
}

/// Frame budget shared between the device driver and the pipeline.
#[derive(Debug, Clone)]
pub struct FramePool {
    inner: Arc<PoolInner>,
}

impl FramePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                capacity,
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Claim one frame slot, failing with `ResourceExhausted` when the pool
    /// is full. CAS loop so a burst of captures cannot overshoot capacity.
    pub fn acquire(&self) -> Result<FrameTicket, PipelineError> {
        let mut current = self.inner.in_flight.load(Ordering::Relaxed);
        loop {
            if current >= self.inner.capacity {
                metrics::counter!("capture_pool_exhausted").increment(1);
                return Err(PipelineError::ResourceExhausted { in_flight: current });
            }
            match self.inner.in_flight.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    return Ok(FrameTicket {
                        pool: self.inner.clone(),
                    })
                }
                Err(observed) => current = observed,
            }
        }
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }
}

/// Returns its slot to the pool on drop.
#[derive(Debug)]
pub struct FrameTicket {
    pool: Arc<PoolInner>,
}

impl Drop for FrameTicket {
    fn drop(&mut self) {
        self.pool.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
