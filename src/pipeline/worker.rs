//! Dedicated processing thread between capture and render.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::capture::frame::RawFrame;
use crate::convert::ColorConverter;
use crate::display::sink::FrameSink;
use crate::pipeline::mailbox::LatestSlot;
use crate::process::FrameProcessor;

/// Owns the thread that runs conversion plus the external processor, so
/// neither the capture callback nor the GPU thread ever waits on them. No
/// lock needed by the sink is held across the processor call; the push
/// afterwards is a single atomic swap.
pub struct ProcessingWorker {
    handle: Option<JoinHandle<()>>,
}

impl ProcessingWorker {
    pub fn spawn(
        raw_slot: Arc<LatestSlot<RawFrame>>,
        nudge: flume::Receiver<()>,
        converter: ColorConverter,
        processor: Box<dyn FrameProcessor>,
        sink: FrameSink,
    ) -> std::io::Result<Self> {
        let handle = thread::Builder::new()
            .name("edgeview-process".into())
            .spawn(move || run(&raw_slot, &nudge, &converter, processor.as_ref(), &sink))?;
        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Blocks until the thread exits; it does so once the capture side is
    /// dropped and the nudge channel disconnects.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(
    raw_slot: &LatestSlot<RawFrame>,
    nudge: &flume::Receiver<()>,
    converter: &ColorConverter,
    processor: &dyn FrameProcessor,
    sink: &FrameSink,
) {
    info!("processing worker started");
    while nudge.recv().is_ok() {
        // Drain everything published since the wakeup; coalesced nudges can
        // cover several frames, of which only the latest is still in the slot.
        while let Some(raw) = raw_slot.take() {
            let start = Instant::now();

            let image = match converter.convert(&raw) {
                Ok(image) => image,
                Err(e) => {
                    warn!(sequence = raw.sequence, "dropping frame: {e}");
                    metrics::counter!("frames_dropped_convert").increment(1);
                    continue;
                }
            };

            let processed = match processor.process(&image.data, image.width, image.height) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(sequence = raw.sequence, "dropping frame: {e}");
                    metrics::counter!("frames_dropped_process").increment(1);
                    continue;
                }
            };

            sink.push(&processed, image.width, image.height);
            metrics::histogram!("process_time_us").record(start.elapsed().as_micros() as f64);
            debug!(sequence = raw.sequence, "frame pushed");
        }
    }
    info!("processing worker stopped");
}
