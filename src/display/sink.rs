//! Pending-frame handoff and the render-thread texture sink.

use std::sync::Arc;

use tracing::trace;

use crate::capture::frame::PackedImage;
use crate::display::scheduler::RenderScheduler;
use crate::error::PipelineError;
use crate::pipeline::mailbox::LatestSlot;

/// The part of the texture lifecycle that talks to the GPU. Render thread
/// only. `respecify` is a full (re)allocation and upload with the given
/// dimensions, never a sub-region update.
pub trait TextureBackend {
    fn respecify(&mut self, width: u32, height: u32, pixels: &[u8]) -> Result<(), PipelineError>;
    fn draw(&mut self) -> Result<(), PipelineError>;
}

/// Texture lifecycle: allocated on the first consumed frame, respecified on
/// every later one. Transitions only happen on a non-empty consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureState {
    #[default]
    Uninitialized,
    Allocated {
        width: u32,
        height: u32,
    },
}

/// Render-thread consumer side of the pending-frame slot.
pub struct TextureSink {
    pending: Arc<LatestSlot<PackedImage>>,
    scheduler: Arc<RenderScheduler>,
    state: TextureState,
}

impl TextureSink {
    /// Build the sink plus the cloneable producer handle for the processing
    /// thread.
    pub fn new(scheduler: Arc<RenderScheduler>) -> (TextureSink, FrameSink) {
        let pending = Arc::new(LatestSlot::new());
        let sink = TextureSink {
            pending: pending.clone(),
            scheduler: scheduler.clone(),
            state: TextureState::default(),
        };
        let handle = FrameSink { pending, scheduler };
        (sink, handle)
    }

    /// Take-and-clear the pending slot and upload when non-empty. Returns
    /// whether an upload happened; an empty slot is a no-op and the draw
    /// that follows redraws the last-uploaded texture.
    pub fn consume_and_upload<B: TextureBackend>(
        &mut self,
        backend: &mut B,
    ) -> Result<bool, PipelineError> {
        // Clear the dirty flag before taking, so a push that lands mid-draw
        // wakes us again.
        self.scheduler.begin_draw();
        let Some(image) = self.pending.take() else {
            return Ok(false);
        };

        backend.respecify(image.width, image.height, &image.data)?;
        self.state = TextureState::Allocated {
            width: image.width,
            height: image.height,
        };
        trace!(width = image.width, height = image.height, "texture respecified");
        Ok(true)
    }

    /// Issue the full-screen quad draw. Once per wake, after
    /// `consume_and_upload`.
    pub fn draw<B: TextureBackend>(&mut self, backend: &mut B) -> Result<(), PipelineError> {
        backend.draw()
    }

    pub fn texture_state(&self) -> TextureState {
        self.state
    }
}

/// Producer handle, callable from the processing thread.
#[derive(Clone)]
pub struct FrameSink {
    pending: Arc<LatestSlot<PackedImage>>,
    scheduler: Arc<RenderScheduler>,
}

impl FrameSink {
    /// Copy the caller's bytes (its buffer may be recycled after this
    /// returns), atomically replace the pending slot, and request a draw.
    /// Last write wins; nothing queues, nothing blocks.
    pub fn push(&self, rgba: &[u8], width: u32, height: u32) {
        let image = PackedImage::copy_from(rgba, width, height);
        if self.pending.publish(image) {
            metrics::counter!("frames_dropped_pending").increment(1);
        }
        self.scheduler.request_draw();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::scheduler::RenderWaker;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct NoopWaker;

    impl RenderWaker for NoopWaker {
        fn wake(&self) {}
    }

    #[derive(Default)]
    struct RecordingBackend {
        respecified: Vec<(u32, u32)>,
        last_pixels: Vec<u8>,
        draws: usize,
    }

    impl TextureBackend for RecordingBackend {
        fn respecify(
            &mut self,
            width: u32,
            height: u32,
            pixels: &[u8],
        ) -> Result<(), PipelineError> {
            self.respecified.push((width, height));
            self.last_pixels = pixels.to_vec();
            Ok(())
        }

        fn draw(&mut self) -> Result<(), PipelineError> {
            self.draws += 1;
            Ok(())
        }
    }

    fn sink() -> (TextureSink, FrameSink) {
        TextureSink::new(Arc::new(RenderScheduler::new(Arc::new(NoopWaker))))
    }

    #[test]
    fn empty_consume_touches_no_gpu_state() {
        let (mut sink, _handle) = sink();
        let mut backend = RecordingBackend::default();
        assert!(!sink.consume_and_upload(&mut backend).unwrap());
        assert!(backend.respecified.is_empty());
        assert_eq!(sink.texture_state(), TextureState::Uninitialized);
    }

    #[test]
    fn second_push_replaces_the_first() {
        let (mut sink, handle) = sink();
        handle.push(&[1u8; 4], 1, 1);
        handle.push(&[2u8; 4], 1, 1);

        let mut backend = RecordingBackend::default();
        assert!(sink.consume_and_upload(&mut backend).unwrap());
        assert_eq!(backend.respecified, vec![(1, 1)]);
        assert_eq!(backend.last_pixels, [2u8; 4]);
    }

    #[test]
    fn n_pushes_one_consume_then_noop() {
        let (mut sink, handle) = sink();
        for i in 1..=5u8 {
            handle.push(&[i; 4], 1, 1);
        }

        let mut backend = RecordingBackend::default();
        assert!(sink.consume_and_upload(&mut backend).unwrap());
        assert_eq!(backend.last_pixels, [5u8; 4]);

        // No intervening push: nothing to re-upload.
        assert!(!sink.consume_and_upload(&mut backend).unwrap());
        assert_eq!(backend.respecified.len(), 1);
    }

    #[test]
    fn dimension_change_causes_two_full_respecifications() {
        let (mut sink, handle) = sink();
        let mut backend = RecordingBackend::default();

        handle.push(&[0u8; 2 * 2 * 4], 2, 2);
        sink.consume_and_upload(&mut backend).unwrap();
        assert_eq!(
            sink.texture_state(),
            TextureState::Allocated {
                width: 2,
                height: 2
            }
        );

        handle.push(&[0u8; 4 * 2 * 4], 4, 2);
        sink.consume_and_upload(&mut backend).unwrap();
        assert_eq!(backend.respecified, vec![(2, 2), (4, 2)]);
        assert_eq!(
            sink.texture_state(),
            TextureState::Allocated {
                width: 4,
                height: 2
            }
        );
    }

    #[test]
    fn every_push_requests_a_draw_and_coalesced_pushes_still_wake_once() {
        struct CountingWaker(AtomicU64);
        impl RenderWaker for CountingWaker {
            fn wake(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let waker = Arc::new(CountingWaker(AtomicU64::new(0)));
        let scheduler = Arc::new(RenderScheduler::new(waker.clone()));
        let (mut sink, handle) = TextureSink::new(scheduler);

        for i in 0..3u8 {
            handle.push(&[i; 4], 1, 1);
        }
        assert_eq!(waker.0.load(Ordering::SeqCst), 1);

        let mut backend = RecordingBackend::default();
        assert!(sink.consume_and_upload(&mut backend).unwrap());
        assert_eq!(backend.last_pixels, [2u8; 4]);

        handle.push(&[9u8; 4], 1, 1);
        assert_eq!(waker.0.load(Ordering::SeqCst), 2);
    }
}
