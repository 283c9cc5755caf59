use crate::error::FrameError;
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFormat {
    Rgb,
    Bgr,
}

/// Interleaved 8-bit, 3-channel raster.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    format: ColorFormat,
}

impl Frame {
    pub fn new(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        format: ColorFormat,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::EmptyFrame { width, height });
        }

        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(FrameError::SizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self {
            pixels,
            width,
            height,
            format,
        })
    }

    /// All-black RGB frame.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            pixels: vec![0u8; width as usize * height as usize * 3],
            width,
            height,
            format: ColorFormat::Rgb,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> ColorFormat {
        self.format
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Pixel data in RGB order, borrowing when no swap is needed.
    pub fn rgb_pixels(&self) -> Cow<'_, [u8]> {
        match self.format {
            ColorFormat::Rgb => Cow::Borrowed(&self.pixels),
            ColorFormat::Bgr => {
                let mut rgb = Vec::with_capacity(self.pixels.len());
                for chunk in self.pixels.chunks_exact(3) {
                    rgb.push(chunk[2]);
                    rgb.push(chunk[1]);
                    rgb.push(chunk[0]);
                }
                Cow::Owned(rgb)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_buffer_length() {
        let err = Frame::new(vec![0u8; 200], 10, 10, ColorFormat::Rgb).unwrap_err();
        assert!(matches!(
            err,
            FrameError::SizeMismatch {
                expected: 300,
                actual: 200,
                ..
            }
        ));
    }

    #[test]
    fn rejects_zero_dimensions() {
        let err = Frame::new(Vec::new(), 0, 4, ColorFormat::Rgb).unwrap_err();
        assert_eq!(err, FrameError::EmptyFrame { width: 0, height: 4 });
    }

    #[test]
    fn bgr_frames_are_swapped_to_rgb() {
        let frame = Frame::new(vec![1, 2, 3, 4, 5, 6], 2, 1, ColorFormat::Bgr).unwrap();
        assert_eq!(frame.rgb_pixels().as_ref(), &[3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn rgb_frames_are_borrowed() {
        let frame = Frame::new(vec![9; 12], 2, 2, ColorFormat::Rgb).unwrap();
        assert!(matches!(frame.rgb_pixels(), Cow::Borrowed(_)));
    }
}
