use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{RgbImage, codecs::jpeg::JpegEncoder};
use inference::{ColorFormat, Frame, FrameError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Unsupported or corrupt image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Decoded image is unusable: {0}")]
    Frame(#[from] FrameError),

    #[error("Image field must be a base64 string, got {0}")]
    NotText(&'static str),
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Frame buffer does not match its {width}x{height} dimensions")]
    InvalidFrame { width: u32, height: u32 },

    #[error("JPEG encoding failed: {0}")]
    Jpeg(#[from] image::ImageError),
}

/// Decode a base64 image, optionally wrapped in a data URI, into an RGB frame.
///
/// Anything up to and including the first `,` is treated as a metadata prefix.
/// Whitespace inside the payload is ignored.
pub fn decode(encoded: &str) -> Result<Frame, DecodeError> {
    let payload = encoded
        .split_once(',')
        .map_or(encoded, |(_, data)| data);
    let compact: String = payload.split_ascii_whitespace().collect();

    let bytes = STANDARD.decode(compact)?;
    let rgb = image::load_from_memory(&bytes)?.into_rgb8();
    let (width, height) = rgb.dimensions();

    Ok(Frame::new(rgb.into_raw(), width, height, ColorFormat::Rgb)?)
}

/// Encode `frame` as JPEG. `quality` is clamped to `1..=100`.
pub fn encode(frame: &Frame, quality: u8) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = (frame.width(), frame.height());
    let image = RgbImage::from_raw(width, height, frame.rgb_pixels().into_owned())
        .ok_or(EncodeError::InvalidFrame { width, height })?;

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100)).encode_image(&image)?;
    Ok(jpeg)
}

pub fn encode_base64(frame: &Frame, quality: u8) -> Result<String, EncodeError> {
    Ok(STANDARD.encode(encode(frame, quality)?))
}
