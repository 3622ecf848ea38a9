//! RGB to HSV conversion and LED band scoring.
//!
//! Matches OpenCV's 8-bit `COLOR_RGB2HSV` output bit for bit: H in 0..180,
//! S and V in 0..255, fixed-point division with 12 fractional bits.

use image::RgbImage;

use crate::models::{HsvBand, LedColor, Roi};

const HSV_SHIFT: u32 = 12;
const HALF: i32 = 1 << (HSV_SHIFT - 1);

fn sdiv(v: i32) -> i32 {
    if v == 0 {
        0
    } else {
        ((255 << HSV_SHIFT) as f64 / v as f64).round() as i32
    }
}

fn hdiv180(diff: i32) -> i32 {
    if diff == 0 {
        0
    } else {
        ((180 << HSV_SHIFT) as f64 / (6.0 * diff as f64)).round() as i32
    }
}

/// Convert one RGB pixel to 8-bit HSV.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (rgb[0] as i32, rgb[1] as i32, rgb[2] as i32);
    let v = r.max(g).max(b);
    let diff = v - r.min(g).min(b);

    let s = (diff * sdiv(v) + HALF) >> HSV_SHIFT;

    let raw = if v == r {
        g - b
    } else if v == g {
        b - r + 2 * diff
    } else {
        r - g + 4 * diff
    };
    let mut h = (raw * hdiv180(diff) + HALF) >> HSV_SHIFT;
    if h < 0 {
        h += 180;
    }

    [h as u8, s.clamp(0, 255) as u8, v as u8]
}

/// Brightness score of one frame: the maximum V among ROI pixels inside the band.
///
/// Returns 0 when no pixel matches or the ROI misses the frame entirely.
pub fn frame_score(frame: &RgbImage, roi: &Roi, led: LedColor) -> u8 {
    band_score(frame, roi, &led.band())
}

pub(crate) fn band_score(frame: &RgbImage, roi: &Roi, band: &HsvBand) -> u8 {
    let region = roi.clamp_to(frame.width(), frame.height());
    let mut best = 0u8;
    for y in region.y..region.y + region.height {
        for x in region.x..region.x + region.width {
            let hsv = rgb_to_hsv(frame.get_pixel(x, y).0);
            if hsv[2] > best && band.contains(hsv) {
                best = hsv[2];
            }
        }
    }
    best
}
