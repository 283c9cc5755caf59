use crate::frame::Frame;
use common::span;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};

/// Ratio of original to resized dimension, per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub scale_x: f32,
    pub scale_y: f32,
}

impl ScaleFactors {
    pub const IDENTITY: ScaleFactors = ScaleFactors {
        scale_x: 1.0,
        scale_y: 1.0,
    };
}

/// Target size when the long edge is capped at `max_dimension`, rounded to the
/// nearest pixel and never below one.
pub fn resized_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dimension {
        return (width, height);
    }

    let scale = max_dimension as f64 / longest as f64;
    let new_width = (width as f64 * scale).round().max(1.0) as u32;
    let new_height = (height as f64 * scale).round().max(1.0) as u32;
    (new_width.min(max_dimension), new_height.min(max_dimension))
}

/// Shrink `frame` so its long edge is at most `max_dimension`.
///
/// Frames already within bounds are returned untouched with
/// [`ScaleFactors::IDENTITY`]. The two scale factors are computed independently
/// so rounding on either axis is carried through to the box mapping.
pub fn resize_frame(frame: Frame, max_dimension: u32) -> anyhow::Result<(Frame, ScaleFactors)> {
    anyhow::ensure!(max_dimension > 0, "max_dimension must be positive");

    let (width, height, format) = (frame.width(), frame.height(), frame.format());
    let (new_width, new_height) = resized_dimensions(width, height, max_dimension);

    if (new_width, new_height) == (width, height) {
        return Ok((frame, ScaleFactors::IDENTITY));
    }

    let _s = span!("resize_frame");

    let src = Image::from_vec_u8(width, height, frame.into_pixels(), PixelType::U8x3)?;
    let mut dst = Image::new(new_width, new_height, PixelType::U8x3);

    Resizer::new().resize(
        &src,
        &mut dst,
        &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
    )?;

    let resized = Frame::new(dst.into_vec(), new_width, new_height, format)?;
    let scale = ScaleFactors {
        scale_x: width as f32 / new_width as f32,
        scale_y: height as f32 / new_height as f32,
    };

    tracing::trace!(
        width,
        height,
        new_width,
        new_height,
        scale_x = scale.scale_x,
        scale_y = scale.scale_y,
        "Resized frame"
    );

    Ok((resized, scale))
}
