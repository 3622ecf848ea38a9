//! Annotated detection frame.

use image::{Rgb, RgbImage};

use crate::models::{LedColor, Roi};

const OUTLINE: u32 = 2;

/// Copy of `frame` with the ROI outlined in the LED's colour.
pub fn annotate_detection(frame: &RgbImage, roi: &Roi, led: LedColor) -> RgbImage {
    let mut out = frame.clone();
    let region = roi.clamp_to(frame.width(), frame.height());
    if region.is_empty() {
        return out;
    }

    let color = Rgb(led.outline_rgb());
    let right = region.x + region.width - 1;
    let bottom = region.y + region.height - 1;

    for t in 0..OUTLINE {
        for x in region.x..=right {
            put(&mut out, x, region.y + t, color);
            put(&mut out, x, bottom.saturating_sub(t), color);
        }
        for y in region.y..=bottom {
            put(&mut out, region.x + t, y, color);
            put(&mut out, right.saturating_sub(t), y, color);
        }
    }
    out
}

fn put(image: &mut RgbImage, x: u32, y: u32, color: Rgb<u8>) {
    if x < image.width() && y < image.height() {
        image.put_pixel(x, y, color);
    }
}
