use thiserror::Error;

/// Pipeline error taxonomy. Per-frame failures drop the affected frame and
/// the pipeline keeps running; only GPU context failures are fatal.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Stride/dimension math does not fit the backing plane buffers.
    /// Checked before any indexing, never caught after the fact.
    #[error("invalid frame geometry ({width}x{height}): {detail}")]
    InvalidFrameGeometry {
        width: u32,
        height: u32,
        detail: String,
    },

    /// The device frame pool has no free slot. Retry/backoff is the
    /// caller's policy.
    #[error("frame pool exhausted ({in_flight} frames in flight)")]
    ResourceExhausted { in_flight: usize },

    /// The external processing routine failed for one frame.
    #[error("frame processing failed: {0}")]
    ProcessingFailure(String),

    /// Surface or texture failure. Fatal to the render context.
    #[error("gpu context failure: {0}")]
    Gpu(String),
}
