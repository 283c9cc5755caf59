use crate::mapper::GOOD_POSTURE_CLASS_ID;
use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use inference::{ColorFormat, Frame, FrameError, RawDetection};

const GOOD_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BAD_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const BORDER_WIDTH: i32 = 2;

/// Draw each detection's box onto `frame`, green for good posture and red otherwise.
///
/// Boxes are in `frame`'s own pixel space. The result is always RGB.
pub fn draw_detections(frame: &Frame, detections: &[RawDetection]) -> Result<Frame, FrameError> {
    let (width, height) = (frame.width(), frame.height());
    let Some(mut image) = RgbImage::from_raw(width, height, frame.rgb_pixels().into_owned()) else {
        return Err(FrameError::SizeMismatch {
            width,
            height,
            expected: (width * height * 3) as usize,
            actual: frame.pixels().len(),
        });
    };

    for d in detections {
        let color = if d.class_id == GOOD_POSTURE_CLASS_ID {
            GOOD_COLOR
        } else {
            BAD_COLOR
        };

        let x = d.x1.max(0.0) as i32;
        let y = d.y1.max(0.0) as i32;
        let w = (d.x2 - d.x1).min(width as f32 - x as f32) as i32;
        let h = (d.y2 - d.y1).min(height as f32 - y as f32) as i32;

        // Nested rectangles for a thicker border
        for inset in 0..BORDER_WIDTH {
            let (iw, ih) = (w - 2 * inset, h - 2 * inset);
            if iw <= 0 || ih <= 0 {
                break;
            }
            let rect = Rect::at(x + inset, y + inset).of_size(iw as u32, ih as u32);
            draw_hollow_rect_mut(&mut image, rect, color);
        }
    }

    Frame::new(image.into_raw(), width, height, ColorFormat::Rgb)
}
