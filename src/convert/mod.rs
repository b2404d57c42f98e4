//! Planar YUV 420 to packed RGBA conversion.

use std::time::Instant;

use bytes::Bytes;

use crate::capture::frame::{PackedImage, Plane, RawFrame};
use crate::error::PipelineError;

/// Fixed-point (Q16) YUV to RGB coefficients. The transform itself is a
/// swappable policy; the default is full-range BT.601, which maps
/// y=0, u=v=128 to opaque black.
#[derive(Debug, Clone, Copy)]
pub struct ColorMatrix {
    pub rv: i32,
    pub gu: i32,
    pub gv: i32,
    pub bu: i32,
}

impl ColorMatrix {
    /// R = Y + 1.402 Cr, G = Y - 0.344 Cb - 0.714 Cr, B = Y + 1.772 Cb.
    pub const BT601_FULL: ColorMatrix = ColorMatrix {
        rv: 91881,
        gu: -22554,
        gv: -46802,
        bu: 116130,
    };
}

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::BT601_FULL
    }
}

/// Pure synchronous converter. No shared mutable state across calls; each
/// conversion allocates its own output buffer.
#[derive(Debug, Default)]
pub struct ColorConverter {
    matrix: ColorMatrix,
}

impl ColorConverter {
    pub fn new(matrix: ColorMatrix) -> Self {
        Self { matrix }
    }

    /// Convert one raw frame into a fresh `PackedImage`. Logical dimensions
    /// come from the crop rect; all plane strides are honored exactly.
    pub fn convert(&self, frame: &RawFrame) -> Result<PackedImage, PipelineError> {
        let start = Instant::now();
        validate_geometry(frame)?;

        let crop = frame.crop;
        let (w, h) = (crop.width as usize, crop.height as usize);
        let (left, top) = (crop.left as usize, crop.top as usize);
        // Chroma is subsampled at half resolution in both axes.
        let (cleft, ctop) = (left / 2, top / 2);

        let m = self.matrix;
        let mut out = Vec::with_capacity(w * h * 4);
        for r in 0..h {
            let y_row = (top + r) * frame.y.row_stride;
            let u_row = (ctop + r / 2) * frame.u.row_stride;
            let v_row = (ctop + r / 2) * frame.v.row_stride;
            for c in 0..w {
                let y = i32::from(frame.y.data[y_row + (left + c) * frame.y.pixel_stride]);
                let cb = i32::from(frame.u.data[u_row + (cleft + c / 2) * frame.u.pixel_stride]) - 128;
                let cr = i32::from(frame.v.data[v_row + (cleft + c / 2) * frame.v.pixel_stride]) - 128;

                out.push(clamp_u8(y + ((m.rv * cr) >> 16)));
                out.push(clamp_u8(y + ((m.gu * cb + m.gv * cr) >> 16)));
                out.push(clamp_u8(y + ((m.bu * cb) >> 16)));
                out.push(255);
            }
        }

        metrics::histogram!("convert_time_us").record(start.elapsed().as_micros() as f64);
        Ok(PackedImage::new(crop.width, crop.height, Bytes::from(out)))
    }
}

#[inline]
fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Reject bad stride/dimension math before any plane is indexed. The
/// maximal offset each loop can compute must lie inside its plane.
fn validate_geometry(frame: &RawFrame) -> Result<(), PipelineError> {
    let crop = frame.crop;
    let fail = |detail: String| PipelineError::InvalidFrameGeometry {
        width: crop.width,
        height: crop.height,
        detail,
    };

    if crop.width == 0 || crop.height == 0 {
        return Err(fail("zero crop dimension".into()));
    }
    if u64::from(crop.left) + u64::from(crop.width) > u64::from(frame.width)
        || u64::from(crop.top) + u64::from(crop.height) > u64::from(frame.height)
    {
        return Err(fail(format!(
            "crop exceeds frame bounds {}x{}",
            frame.width, frame.height
        )));
    }

    let (w, h) = (crop.width as usize, crop.height as usize);
    let (left, top) = (crop.left as usize, crop.top as usize);
    let y_max = (top + h - 1) * frame.y.row_stride + (left + w - 1) * frame.y.pixel_stride;
    if y_max >= frame.y.data.len() {
        return Err(fail(format!(
            "luma offset {y_max} outside plane of {} bytes",
            frame.y.data.len()
        )));
    }

    let c_row = top / 2 + (h - 1) / 2;
    let c_col = left / 2 + (w - 1) / 2;
    for (name, plane) in [("u", &frame.u), ("v", &frame.v)] {
        let c_max = c_row * plane.row_stride + c_col * plane.pixel_stride;
        if c_max >= plane.data.len() {
            return Err(fail(format!(
                "{name} chroma offset {c_max} outside plane of {} bytes",
                plane.data.len()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::frame::CropRect;
    use std::time::Instant;

    /// Tightly packed YUV 420 frame from per-plane sample functions.
    fn frame_with_layout(
        width: u32,
        height: u32,
        y_pad: usize,
        c_pad: usize,
        c_pixel_stride: usize,
        luma: impl Fn(usize, usize) -> u8,
        chroma_u: impl Fn(usize, usize) -> u8,
        chroma_v: impl Fn(usize, usize) -> u8,
    ) -> RawFrame {
        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));

        let y_stride = w + y_pad;
        let mut y = vec![0u8; y_stride * h];
        for r in 0..h {
            for c in 0..w {
                y[r * y_stride + c] = luma(r, c);
            }
        }

        let c_stride = cw * c_pixel_stride + c_pad;
        let mut u = vec![0u8; c_stride * ch];
        let mut v = vec![0u8; c_stride * ch];
        for r in 0..ch {
            for c in 0..cw {
                u[r * c_stride + c * c_pixel_stride] = chroma_u(r, c);
                v[r * c_stride + c * c_pixel_stride] = chroma_v(r, c);
            }
        }

        let plane = |data: Vec<u8>, row_stride: usize, pixel_stride: usize| Plane {
            data: Bytes::from(data),
            row_stride,
            pixel_stride,
        };
        RawFrame {
            width,
            height,
            crop: CropRect::full(width, height),
            y: plane(y, y_stride, 1),
            u: plane(u, c_stride, c_pixel_stride),
            v: plane(v, c_stride, c_pixel_stride),
            sequence: 1,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn output_is_exactly_w_h_4_bytes() {
        let converter = ColorConverter::default();
        for (w, h) in [(2, 2), (4, 4), (6, 2), (640, 480)] {
            let frame = frame_with_layout(w, h, 0, 0, 1, |_, _| 90, |_, _| 128, |_, _| 128);
            let image = converter.convert(&frame).unwrap();
            assert_eq!(image.data.len(), (w * h * 4) as usize);
            assert_eq!((image.width, image.height), (w, h));
        }
    }

    #[test]
    fn padded_strides_match_tight_layout() {
        let converter = ColorConverter::default();
        let luma = |r: usize, c: usize| (r * 16 + c * 7) as u8;
        let cu = |r: usize, c: usize| (100 + r * 8 + c) as u8;
        let cv = |r: usize, c: usize| (140 + r + c * 9) as u8;

        let tight = frame_with_layout(8, 6, 0, 0, 1, luma, cu, cv);
        let padded = frame_with_layout(8, 6, 11, 5, 2, luma, cu, cv);
        assert_eq!(
            converter.convert(&tight).unwrap().data,
            converter.convert(&padded).unwrap().data
        );
    }

    #[test]
    fn tight_luma_path_is_a_contiguous_copy() {
        // With a gray chroma pair every output channel equals the luma byte,
        // so pixel_stride=1 / row_stride=width must reproduce the Y plane.
        let converter = ColorConverter::default();
        let frame = frame_with_layout(4, 4, 0, 0, 1, |r, c| (r * 4 + c) as u8, |_, _| 128, |_, _| 128);
        let image = converter.convert(&frame).unwrap();
        for (i, px) in image.data.chunks(4).enumerate() {
            assert_eq!(px, [i as u8, i as u8, i as u8, 255]);
        }
    }

    #[test]
    fn black_frame_converts_to_opaque_black() {
        let converter = ColorConverter::default();
        let frame = frame_with_layout(4, 4, 3, 1, 2, |_, _| 0, |_, _| 128, |_, _| 128);
        let image = converter.convert(&frame).unwrap();
        assert_eq!(image.data.len(), 64);
        assert!(image.data.chunks(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn crop_selects_the_right_pixels() {
        let converter = ColorConverter::default();
        let mut frame = frame_with_layout(8, 8, 0, 0, 1, |r, c| (r * 8 + c) as u8, |_, _| 128, |_, _| 128);
        frame.crop = CropRect {
            left: 2,
            top: 4,
            width: 4,
            height: 2,
        };
        let image = converter.convert(&frame).unwrap();
        assert_eq!((image.width, image.height), (4, 2));
        // First output pixel comes from source (4, 2).
        assert_eq!(&image.data[..4], [34, 34, 34, 255]);
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let converter = ColorConverter::default();
        let mut frame = frame_with_layout(4, 4, 0, 0, 1, |_, _| 0, |_, _| 128, |_, _| 128);
        frame.crop.width = 0;
        assert!(matches!(
            converter.convert(&frame),
            Err(PipelineError::InvalidFrameGeometry { .. })
        ));
    }

    #[test]
    fn oversized_stride_is_rejected_before_indexing() {
        let converter = ColorConverter::default();
        let mut frame = frame_with_layout(4, 4, 0, 0, 1, |_, _| 0, |_, _| 128, |_, _| 128);
        // Claims rows the backing buffer does not have.
        frame.y.row_stride = 1024;
        assert!(matches!(
            converter.convert(&frame),
            Err(PipelineError::InvalidFrameGeometry { .. })
        ));
    }

    #[test]
    fn short_chroma_plane_is_rejected() {
        let converter = ColorConverter::default();
        let mut frame = frame_with_layout(4, 4, 0, 0, 1, |_, _| 0, |_, _| 128, |_, _| 128);
        frame.v.data = frame.v.data.slice(..1);
        frame.v.row_stride = 2;
        assert!(matches!(
            converter.convert(&frame),
            Err(PipelineError::InvalidFrameGeometry { .. })
        ));
    }

    #[test]
    fn saturated_chroma_is_clamped() {
        let converter = ColorConverter::default();
        let frame = frame_with_layout(2, 2, 0, 0, 1, |_, _| 255, |_, _| 255, |_, _| 255);
        let image = converter.convert(&frame).unwrap();
        // Red and blue overflow past 255 and must clamp, green clamps at 0.
        assert_eq!(&image.data[..4], [255, 120, 255, 255]);
    }
}
