pub mod app;
pub mod gpu;
pub mod scheduler;
pub mod sink;

pub use gpu::GpuDisplay;
pub use scheduler::{RenderScheduler, RenderWaker};
pub use sink::{FrameSink, TextureBackend, TextureSink, TextureState};
