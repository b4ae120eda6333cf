//! Hue masking and region extraction.
//!
//! HSV follows the 8-bit camera convention: H in [0, 180), S and V in
//! [0, 255]. A pixel matches when its hue is within `sensitivity * 10` of the
//! center (measured around the circle) and it is saturated and bright enough
//! to carry a meaningful hue.

use super::camera::Frame;

pub const HUE_STEPS: f32 = 180.0;
pub const MIN_SATURATION: u8 = 100;
pub const MIN_VALUE: u8 = 100;
const HUE_WINDOW_PER_SENSITIVITY: f32 = 10.0;

/// (h, s, v) with h in [0, 180)
pub fn rgb_to_hsv(rgb: [u8; 3]) -> (f32, u8, u8) {
    let [r, g, b] = rgb.map(|c| c as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = max - min;
    let s = if max > 0.0 { (diff / max * 255.0).round() as u8 } else { 0 };
    let v = max as u8;
    if diff == 0.0 {
        return (0.0, s, v);
    }
    let mut h = if max == r {
        60.0 * (g - b) / diff
    } else if max == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }
    ((h / 2.0) % HUE_STEPS, s, v)
}

/// Shortest distance between two hues on the 180-step circle
#[inline]
pub fn hue_distance(a: f32, b: f32) -> f32 {
    let d = (a - b).abs() % HUE_STEPS;
    d.min(HUE_STEPS - d)
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaskResult {
    /// dimensions of the analysed (decimated) grid
    pub width: usize,
    pub height: usize,
    pub mask: Vec<bool>,
    /// fraction of analysed pixels that matched at all
    pub match_ratio: f32,
    /// pixels in the largest 4-connected matching region
    pub region_pixels: usize,
    /// largest region / analysed pixels
    pub coverage: f32,
    /// circular mean of the region's hue, normalized to [0, 1)
    pub hue: f32,
}

/// Mask `frame` around `hue_center` and find the dominant region.
/// The frame is mirrored left to right (the player faces the camera) and
/// frames wider than `max_width` are decimated first, so cost is bounded no
/// matter what resolution the camera hands over.
pub fn apply_hue_mask(frame: &Frame, hue_center: f32, sensitivity: f32, max_width: usize) -> MaskResult {
    let step = frame.width().div_ceil(max_width.max(1)).max(1);
    let width = frame.width().div_ceil(step);
    let height = frame.height().div_ceil(step);
    let window = sensitivity * HUE_WINDOW_PER_SENSITIVITY;

    let mut mask = vec![false; width * height];
    let mut hues = vec![0.0f32; width * height];
    let mut matched = 0usize;
    for y in 0..height {
        for x in 0..width {
            let (h, s, v) = rgb_to_hsv(frame.pixel(frame.width() - 1 - x * step, y * step));
            if s >= MIN_SATURATION && v >= MIN_VALUE && hue_distance(h, hue_center) <= window {
                mask[y * width + x] = true;
                hues[y * width + x] = h;
                matched += 1;
            }
        }
    }

    let total = (width * height).max(1);
    let (region_pixels, hue) = largest_region(&mask, &hues, width, height);
    MaskResult {
        width,
        height,
        mask,
        match_ratio: matched as f32 / total as f32,
        region_pixels,
        coverage: region_pixels as f32 / total as f32,
        hue,
    }
}

// Flood fill every region, keep the biggest. Returns (size, normalized hue).
fn largest_region(mask: &[bool], hues: &[f32], width: usize, height: usize) -> (usize, f32) {
    let mut visited = vec![false; mask.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut best = (0usize, 0.0f32, 0.0f32); // size, sum cos, sum sin

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }
        let (mut size, mut sum_cos, mut sum_sin) = (0usize, 0.0f32, 0.0f32);
        visited[start] = true;
        stack.push(start);
        while let Some(i) = stack.pop() {
            size += 1;
            let angle = hues[i] / HUE_STEPS * std::f32::consts::TAU;
            sum_cos += angle.cos();
            sum_sin += angle.sin();

            let (x, y) = (i % width, i / width);
            let mut visit = |j: usize| {
                if mask[j] && !visited[j] {
                    visited[j] = true;
                    stack.push(j);
                }
            };
            if x > 0 {
                visit(i - 1);
            }
            if x + 1 < width {
                visit(i + 1);
            }
            if y > 0 {
                visit(i - width);
            }
            if y + 1 < height {
                visit(i + width);
            }
        }
        if size > best.0 {
            best = (size, sum_cos, sum_sin);
        }
    }

    if best.0 == 0 {
        return (0, 0.0);
    }
    let mean = best.2.atan2(best.1).rem_euclid(std::f32::consts::TAU) / std::f32::consts::TAU;
    (best.0, if mean >= 1.0 { 0.0 } else { mean })
}
