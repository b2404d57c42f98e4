pub mod mailbox;
pub mod worker;

use std::sync::Arc;

pub use mailbox::LatestSlot;
pub use worker::ProcessingWorker;

use crate::capture::source::FrameSource;
use crate::convert::ColorConverter;
use crate::display::sink::FrameSink;
use crate::process::FrameProcessor;

/// Wire up the capture-to-processing handoff and start the worker thread.
/// Dropping the returned `FrameSource` disconnects the worker's wake
/// channel, which makes it exit.
pub fn start(
    converter: ColorConverter,
    processor: Box<dyn FrameProcessor>,
    sink: FrameSink,
) -> std::io::Result<(FrameSource, ProcessingWorker)> {
    let raw_slot = Arc::new(LatestSlot::new());
    let (nudge_tx, nudge_rx) = flume::bounded(1);
    let source = FrameSource::new(raw_slot.clone(), nudge_tx);
    let worker = ProcessingWorker::spawn(raw_slot, nudge_rx, converter, processor, sink)?;
    Ok((source, worker))
}
