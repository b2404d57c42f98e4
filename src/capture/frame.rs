use std::time::Instant;

use bytes::Bytes;

use crate::capture::pool::FrameTicket;

/// Region of interest within the raw sensor buffer. Logical output
/// dimensions come from here, not from the backing buffer size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Crop covering the whole frame.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            width,
            height,
        }
    }
}

/// One plane of a device frame. `row_stride` may exceed the logical row
/// size (padding) and `pixel_stride` may exceed 1 (interleaved layouts).
#[derive(Debug)]
pub struct DevicePlane {
    pub data: Vec<u8>,
    pub row_stride: usize,
    pub pixel_stride: usize,
}

/// A frame as handed over by the capture device: luma plane plus two
/// half-resolution chroma planes, each with its own layout. Holds a pool
/// ticket; dropping the frame releases the underlying device slot, which
/// happens before the capture callback returns on every path.
#[derive(Debug)]
pub struct DeviceFrame {
    pub width: u32,
    pub height: u32,
    pub crop: CropRect,
    /// Y, then the two chroma planes.
    pub planes: [DevicePlane; 3],
    _ticket: FrameTicket,
}

impl DeviceFrame {
    pub fn new(
        width: u32,
        height: u32,
        crop: CropRect,
        planes: [DevicePlane; 3],
        ticket: FrameTicket,
    ) -> Self {
        Self {
            width,
            height,
            crop,
            planes,
            _ticket: ticket,
        }
    }
}

/// Immutable plane copy, safe to share across threads.
#[derive(Debug, Clone)]
pub struct Plane {
    pub data: Bytes,
    pub row_stride: usize,
    pub pixel_stride: usize,
}

impl Plane {
    pub fn copy_from(plane: &DevicePlane) -> Self {
        Self {
            data: Bytes::copy_from_slice(&plane.data),
            row_stride: plane.row_stride,
            pixel_stride: plane.pixel_stride,
        }
    }
}

/// Owned copy of one captured frame crossing into the processing context.
/// Plane strides are preserved exactly as the device reported them.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub crop: CropRect,
    pub y: Plane,
    pub u: Plane,
    pub v: Plane,
    pub sequence: u64,
    pub timestamp: Instant,
}

/// Packed interleaved RGBA image, `data.len() == width * height * 4`.
/// Immutable once constructed; every pipeline stage produces a fresh one
/// rather than mutating in place, so no buffer is ever visible to two
/// threads through a mutable view.
#[derive(Debug, Clone)]
pub struct PackedImage {
    pub width: u32,
    pub height: u32,
    pub data: Bytes,
}

impl PackedImage {
    pub fn new(width: u32, height: u32, data: Bytes) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            data,
        }
    }

    /// Private copy of a caller-owned buffer.
    pub fn copy_from(rgba: &[u8], width: u32, height: u32) -> Self {
        Self::new(width, height, Bytes::copy_from_slice(rgba))
    }
}
