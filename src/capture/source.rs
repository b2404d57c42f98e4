//! Capture-side glue: device callback into the processing handoff.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::trace;

use crate::capture::frame::{DeviceFrame, Plane, RawFrame};
use crate::pipeline::mailbox::LatestSlot;

/// Receives frames from the capture device, asynchronously and serially per
/// source. Each call copies the planes out and publishes them latest-wins
/// toward the processing thread; the device frame itself is consumed and
/// released before this returns, so the device keeps cycling its small
/// buffer pool no matter how far behind the rest of the pipeline is.
pub struct FrameSource {
    raw_slot: Arc<LatestSlot<RawFrame>>,
    nudge: flume::Sender<()>,
    sequence: AtomicU64,
}

impl FrameSource {
    pub(crate) fn new(raw_slot: Arc<LatestSlot<RawFrame>>, nudge: flume::Sender<()>) -> Self {
        Self {
            raw_slot,
            nudge,
            sequence: AtomicU64::new(0),
        }
    }

    /// The capture callback. Never blocks on conversion, processing, or GPU
    /// work.
    pub fn on_frame(&self, frame: DeviceFrame) {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let [y, u, v] = &frame.planes;
        let raw = RawFrame {
            width: frame.width,
            height: frame.height,
            crop: frame.crop,
            y: Plane::copy_from(y),
            u: Plane::copy_from(u),
            v: Plane::copy_from(v),
            sequence,
            timestamp: Instant::now(),
        };

        if self.raw_slot.publish(raw) {
            metrics::counter!("frames_dropped_capture").increment(1);
        }
        // A full nudge channel means the worker already has a wakeup pending.
        let _ = self.nudge.try_send(());
        trace!(sequence, "frame captured");

        // `frame` drops here, returning its ticket to the pool.
    }
}
