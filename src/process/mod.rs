//! Pluggable frame processing stage.
//!
//! The pipeline treats the processor as an opaque, possibly slow,
//! synchronous call made on the processing thread. It must return a buffer
//! of the same length and must not retain the input.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Packed-RGBA-in, packed-RGBA-out transform with preserved dimensions.
pub trait FrameProcessor: Send {
    fn process(&self, rgba: &[u8], width: u32, height: u32) -> Result<Vec<u8>, PipelineError>;
}

/// Which transform the pipeline runs; selected from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    Identity,
    Grayscale,
    SobelEdge,
}

impl ProcessorKind {
    pub fn build(self) -> Box<dyn FrameProcessor> {
        match self {
            ProcessorKind::Identity => Box::new(IdentityProcessor),
            ProcessorKind::Grayscale => Box::new(GrayscaleProcessor),
            ProcessorKind::SobelEdge => Box::new(SobelEdgeProcessor),
        }
    }
}

/// Passes frames through untouched.
pub struct IdentityProcessor;

impl FrameProcessor for IdentityProcessor {
    fn process(&self, rgba: &[u8], _width: u32, _height: u32) -> Result<Vec<u8>, PipelineError> {
        Ok(rgba.to_vec())
    }
}

/// Luma-weighted grayscale, replicated back to RGBA.
pub struct GrayscaleProcessor;

impl FrameProcessor for GrayscaleProcessor {
    fn process(&self, rgba: &[u8], width: u32, height: u32) -> Result<Vec<u8>, PipelineError> {
        check_len(rgba, width, height)?;
        let mut out = Vec::with_capacity(rgba.len());
        for px in rgba.chunks_exact(4) {
            let y = luma(px);
            out.extend_from_slice(&[y, y, y, px[3]]);
        }
        Ok(out)
    }
}

/// Sobel edge magnitude on the luma channel.
pub struct SobelEdgeProcessor;

impl FrameProcessor for SobelEdgeProcessor {
    fn process(&self, rgba: &[u8], width: u32, height: u32) -> Result<Vec<u8>, PipelineError> {
        check_len(rgba, width, height)?;
        let (w, h) = (width as usize, height as usize);
        let gray: Vec<u8> = rgba.chunks_exact(4).map(luma).collect();

        let mut out = vec![0u8; rgba.len()];
        for r in 0..h {
            for c in 0..w {
                let m = if r == 0 || c == 0 || r == h - 1 || c == w - 1 {
                    // Border pixels have no full 3x3 neighborhood.
                    0u8
                } else {
                    let at = |dr: isize, dc: isize| {
                        i32::from(
                            gray[(r as isize + dr) as usize * w + (c as isize + dc) as usize],
                        )
                    };
                    let gx = at(-1, 1) + 2 * at(0, 1) + at(1, 1)
                        - at(-1, -1)
                        - 2 * at(0, -1)
                        - at(1, -1);
                    let gy = at(1, -1) + 2 * at(1, 0) + at(1, 1)
                        - at(-1, -1)
                        - 2 * at(-1, 0)
                        - at(-1, 1);
                    (gx.abs() + gy.abs()).min(255) as u8
                };
                let o = (r * w + c) * 4;
                out[o] = m;
                out[o + 1] = m;
                out[o + 2] = m;
                out[o + 3] = 255;
            }
        }
        Ok(out)
    }
}

#[inline]
fn luma(px: &[u8]) -> u8 {
    ((77 * u32::from(px[0]) + 150 * u32::from(px[1]) + 29 * u32::from(px[2])) >> 8) as u8
}

fn check_len(rgba: &[u8], width: u32, height: u32) -> Result<(), PipelineError> {
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(PipelineError::ProcessingFailure(format!(
            "buffer of {} bytes does not match {width}x{height}",
            rgba.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_returns_same_bytes() {
        let input = vec![1u8, 2, 3, 255, 4, 5, 6, 255];
        assert_eq!(IdentityProcessor.process(&input, 2, 1).unwrap(), input);
    }

    #[test]
    fn grayscale_preserves_length_and_flattens_channels() {
        let input = vec![200u8, 30, 90, 255, 0, 0, 0, 255];
        let out = GrayscaleProcessor.process(&input, 2, 1).unwrap();
        assert_eq!(out.len(), input.len());
        assert_eq!(out[0], out[1]);
        assert_eq!(out[1], out[2]);
        assert_eq!(out[3], 255);
        assert_eq!(&out[4..8], [0, 0, 0, 255]);
    }

    #[test]
    fn grayscale_of_white_stays_white() {
        let input = vec![255u8; 16];
        let out = GrayscaleProcessor.process(&input, 2, 2).unwrap();
        assert!(out.chunks(4).all(|px| px == [255, 255, 255, 255]));
    }

    #[test]
    fn sobel_of_flat_image_is_black() {
        let input = vec![128u8; 4 * 4 * 4];
        let out = SobelEdgeProcessor.process(&input, 4, 4).unwrap();
        assert!(out.chunks(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn sobel_finds_a_vertical_edge() {
        // Left half black, right half white on a 4x4 image.
        let mut input = vec![0u8; 4 * 4 * 4];
        for r in 0..4 {
            for c in 2..4 {
                let o = (r * 4 + c) * 4;
                input[o] = 255;
                input[o + 1] = 255;
                input[o + 2] = 255;
            }
        }
        let out = SobelEdgeProcessor.process(&input, 4, 4).unwrap();
        // Interior pixels adjacent to the edge must light up.
        assert!(out[(1 * 4 + 1) * 4] > 0);
        assert!(out[(2 * 4 + 2) * 4] > 0);
    }

    #[test]
    fn length_mismatch_is_a_processing_failure() {
        let input = vec![0u8; 12];
        assert!(matches!(
            GrayscaleProcessor.process(&input, 2, 2),
            Err(PipelineError::ProcessingFailure(_))
        ));
    }
}
