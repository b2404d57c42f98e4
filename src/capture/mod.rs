pub mod frame;
pub mod pool;
pub mod source;
pub mod synthetic;

pub use frame::{CropRect, DeviceFrame, DevicePlane, PackedImage, Plane, RawFrame};
pub use pool::FramePool;
pub use source::FrameSource;
