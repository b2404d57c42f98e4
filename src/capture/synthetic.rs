//! Synthetic YUV 420 source for running the pipeline without camera
//! hardware. Uses padded and interleaved plane layouts on purpose so the
//! general stride path is the one that runs.

use std::time::Duration;

use tracing::{info, warn};

use crate::capture::frame::{CropRect, DeviceFrame, DevicePlane};
use crate::capture::pool::FramePool;
use crate::capture::source::FrameSource;
use crate::error::PipelineError;

/// Generates a moving gradient in planar YUV 420 at a fixed rate, feeding it
/// through the same callback path a real device would use.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    fps: u32,
    pool: FramePool,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32, fps: u32, pool: FramePool) -> Self {
        Self {
            width,
            height,
            fps,
            pool,
        }
    }

    /// One device frame, or `ResourceExhausted` when the pool is drained.
    pub fn frame(&self, tick: u64) -> Result<DeviceFrame, PipelineError> {
        let ticket = self.pool.acquire()?;
        let (w, h) = (self.width as usize, self.height as usize);
        let (cw, ch) = (w / 2, h / 2);

        let y_stride = w + 13;
        let mut y = vec![0u8; y_stride * h];
        for r in 0..h {
            let row = r * y_stride;
            for c in 0..w {
                y[row + c] = ((c * 255 / w) as u64 + tick * 3) as u8;
            }
        }

        let c_stride = cw * 2 + 6;
        let mut u = vec![0u8; c_stride * ch];
        let mut v = vec![0u8; c_stride * ch];
        for r in 0..ch {
            let row = r * c_stride;
            for c in 0..cw {
                u[row + c * 2] = (r * 255 / ch) as u8;
                v[row + c * 2] = (tick * 2) as u8;
            }
        }

        Ok(DeviceFrame::new(
            self.width,
            self.height,
            CropRect::full(self.width, self.height),
            [
                DevicePlane {
                    data: y,
                    row_stride: y_stride,
                    pixel_stride: 1,
                },
                DevicePlane {
                    data: u,
                    row_stride: c_stride,
                    pixel_stride: 2,
                },
                DevicePlane {
                    data: v,
                    row_stride: c_stride,
                    pixel_stride: 2,
                },
            ],
            ticket,
        ))
    }

    /// Capture loop; runs until the owning task is dropped.
    pub async fn run(self, source: FrameSource) {
        let fps = self.fps.max(1);
        let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(fps)));
        info!(
            width = self.width,
            height = self.height,
            fps,
            "synthetic capture running"
        );

        let mut tick = 0u64;
        loop {
            interval.tick().await;
            match self.frame(tick) {
                Ok(frame) => source.on_frame(frame),
                // Pool drains as the pipeline catches up; skip this tick.
                Err(e) => warn!("capture: {e}"),
            }
            tick = tick.wrapping_add(1);
        }
    }
}
