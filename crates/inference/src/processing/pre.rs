use crate::frame::Frame;
use common::span;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use ndarray::{Array, IxDyn};

const LETTERBOX_COLOR: u8 = 114;

/// Mapping from model input pixels back to the frame that was fed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxParams {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub frame_width: u32,
    pub frame_height: u32,
}

/// Letterboxes frames into a square model input and normalizes to `[0, 1]` NCHW.
pub struct PreProcessor {
    pub input_size: u32,
}

impl PreProcessor {
    pub fn new(input_size: u32) -> Self {
        Self { input_size }
    }

    pub fn preprocess(&self, frame: &Frame) -> anyhow::Result<(Array<f32, IxDyn>, LetterboxParams)> {
        let _s = span!("preprocess_frame");
        anyhow::ensure!(self.input_size > 0, "input_size must be positive");

        tracing::trace!(
            width = frame.width(),
            height = frame.height(),
            input_size = self.input_size,
            "Preprocessing frame dimensions"
        );

        let (letterboxed, params) = self.resize_and_letterbox(frame)?;
        let input = self.normalize(&letterboxed)?;

        Ok((input, params))
    }

    fn resize_and_letterbox(&self, frame: &Frame) -> anyhow::Result<(Vec<u8>, LetterboxParams)> {
        let _s = span!("resize_and_letterbox");

        let (width, height) = (frame.width(), frame.height());
        let size = self.input_size;

        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let new_width = ((width as f32 * scale).round() as u32).clamp(1, size);
        let new_height = ((height as f32 * scale).round() as u32).clamp(1, size);

        let offset_x = (size - new_width) / 2;
        let offset_y = (size - new_height) / 2;

        let rgb = frame.rgb_pixels().into_owned();
        let resized = if (new_width, new_height) == (width, height) {
            rgb
        } else {
            let src = Image::from_vec_u8(width, height, rgb, PixelType::U8x3)?;
            let mut dst = Image::new(new_width, new_height, PixelType::U8x3);
            Resizer::new().resize(
                &src,
                &mut dst,
                &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
            )?;
            dst.into_vec()
        };

        let stride = (size * 3) as usize;
        let row_len = (new_width * 3) as usize;
        let mut letterboxed = vec![LETTERBOX_COLOR; stride * size as usize];

        for y in 0..new_height as usize {
            let src_row = y * row_len;
            let dst_row = (y + offset_y as usize) * stride + offset_x as usize * 3;
            letterboxed[dst_row..dst_row + row_len]
                .copy_from_slice(&resized[src_row..src_row + row_len]);
        }

        Ok((
            letterboxed,
            LetterboxParams {
                scale,
                offset_x: offset_x as f32,
                offset_y: offset_y as f32,
                frame_width: width,
                frame_height: height,
            },
        ))
    }

    fn normalize(&self, letterboxed: &[u8]) -> anyhow::Result<Array<f32, IxDyn>> {
        let _s = span!("normalize");

        let side = self.input_size as usize;
        let spatial = side * side;
        let mut output = vec![0.0f32; 3 * spatial];

        for (i, px) in letterboxed.chunks_exact(3).enumerate() {
            output[i] = px[0] as f32 / 255.0;
            output[i + spatial] = px[1] as f32 / 255.0;
            output[i + 2 * spatial] = px[2] as f32 / 255.0;
        }

        Ok(Array::from_shape_vec(IxDyn(&[1, 3, side, side]), output)?)
    }
}
