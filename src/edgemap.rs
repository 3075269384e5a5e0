//! Difference-of-Gaussians RGB edge map.

use image::{ImageBuffer, Luma, RgbImage};
use serde::{Deserialize, Serialize};

use crate::normalize::{blur_rgb_f32, rgb_to_f32_channels, NormalizeConfig};

pub const EDGE_MAP_SIDE: u32 = 256;

/// Three 256x256 matrices of signed floats, centered around 0. Stored flat,
/// row-major (y * side + x), to keep the per-item memory footprint close to
/// the `4 * 256 * 256 * 3` bytes the fingerprint's footprint formula uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeMap {
    r: Vec<f32>,
    g: Vec<f32>,
    b: Vec<f32>,
}

impl EdgeMap {
    fn new(r: Vec<f32>, g: Vec<f32>, b: Vec<f32>) -> Self {
        debug_assert_eq!(r.len(), (EDGE_MAP_SIDE * EDGE_MAP_SIDE) as usize);
        debug_assert_eq!(g.len(), r.len());
        debug_assert_eq!(b.len(), r.len());
        EdgeMap { r, g, b }
    }

    pub fn get(&self, x: u32, y: u32) -> [f32; 3] {
        let idx = (y * EDGE_MAP_SIDE + x) as usize;
        [self.r[idx], self.g[idx], self.b[idx]]
    }

    pub fn estimated_memory_footprint(&self) -> usize {
        4 * (EDGE_MAP_SIDE as usize) * (EDGE_MAP_SIDE as usize) * 3
    }
}

/// Build the edge map from an RGB image already fitted into the perceptual
/// bound (e.g. 2048x2048, aspect preserved) — the caller performs that
/// fitting via `normalize::thumbnail_fit` + `normalize::resize_area`.
pub fn build_edge_map(perceptual_rgb: &RgbImage, config: &NormalizeConfig) -> EdgeMap {
    let channels = rgb_to_f32_channels(perceptual_rgb);
    let blurred = blur_rgb_f32(&channels, config.edge_dog_sigma);

    let (w, h) = perceptual_rgb.dimensions();
    let mut dog: [ImageBuffer<Luma<f32>, Vec<f32>>; 3] = [
        ImageBuffer::new(w, h),
        ImageBuffer::new(w, h),
        ImageBuffer::new(w, h),
    ];
    for c in 0..3 {
        for y in 0..h {
            for x in 0..w {
                let diff = channels[c].get_pixel(x, y)[0] - blurred[c].get_pixel(x, y)[0];
                dog[c].put_pixel(x, y, Luma([diff]));
            }
        }
    }

    let (out_w, out_h) = (EDGE_MAP_SIDE, EDGE_MAP_SIDE);
    let r = resize_area_f32(&dog[0], out_w, out_h);
    let g = resize_area_f32(&dog[1], out_w, out_h);
    let b = resize_area_f32(&dog[2], out_w, out_h);
    EdgeMap::new(r, g, b)
}

/// Area-average resize for a single-channel float image, returned flat
/// row-major. Mirrors `normalize::resize_area`'s overlap accumulation but
/// keeps full float precision since DoG values are signed and small.
fn resize_area_f32(img: &ImageBuffer<Luma<f32>, Vec<f32>>, target_w: u32, target_h: u32) -> Vec<f32> {
    let (src_w, src_h) = img.dimensions();
    if src_w == 0 || src_h == 0 || target_w == 0 || target_h == 0 {
        return vec![0.0; (target_w * target_h) as usize];
    }
    let scale_x = src_w as f64 / target_w as f64;
    let scale_y = src_h as f64 / target_h as f64;

    let mut horiz = vec![0.0f64; (target_w * src_h) as usize];
    for y in 0..src_h {
        for ox in 0..target_w {
            let x0 = ox as f64 * scale_x;
            let x1 = x0 + scale_x;
            let lo = x0.floor().max(0.0) as u32;
            let hi = (x1.ceil() as u32).min(src_w).max(lo + 1);
            let mut sum = 0.0f64;
            let mut weight = 0.0f64;
            for sx in lo..hi {
                let overlap = (x1.min(sx as f64 + 1.0) - x0.max(sx as f64)).max(0.0);
                if overlap <= 0.0 {
                    continue;
                }
                sum += img.get_pixel(sx, y)[0] as f64 * overlap;
                weight += overlap;
            }
            horiz[(y * target_w + ox) as usize] = if weight > 0.0 { sum / weight } else { 0.0 };
        }
    }

    let mut out = vec![0.0f32; (target_w * target_h) as usize];
    for ox in 0..target_w {
        for oy in 0..target_h {
            let y0 = oy as f64 * scale_y;
            let y1 = y0 + scale_y;
            let lo = y0.floor().max(0.0) as u32;
            let hi = (y1.ceil() as u32).min(src_h).max(lo + 1);
            let mut sum = 0.0f64;
            let mut weight = 0.0f64;
            for sy in lo..hi {
                let overlap = (y1.min(sy as f64 + 1.0) - y0.max(sy as f64)).max(0.0);
                if overlap <= 0.0 {
                    continue;
                }
                sum += horiz[(sy * target_w + ox) as usize] * overlap;
                weight += overlap;
            }
            out[(oy * target_w + ox) as usize] = if weight > 0.0 { (sum / weight) as f32 } else { 0.0 };
        }
    }
    out
}

/// `M` in the spec's edge-map comparator: the maximum absolute per-channel
/// point difference between two edge maps.
pub fn max_point_difference(a: &EdgeMap, b: &EdgeMap) -> f32 {
    let mut max_diff = 0.0f32;
    for i in 0..a.r.len() {
        max_diff = max_diff.max((a.r[i] - b.r[i]).abs());
        max_diff = max_diff.max((a.g[i] - b.g[i]).abs());
        max_diff = max_diff.max((a.b[i] - b.b[i]).abs());
    }
    max_diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn identical_images_have_zero_edge_map_diff() {
        let config = NormalizeConfig::default();
        let mut img: RgbImage = ImageBuffer::new(64, 64);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = Rgb([((x + y) % 255) as u8, (x % 255) as u8, (y % 255) as u8]);
        }
        let a = build_edge_map(&img, &config);
        let b = build_edge_map(&img, &config);
        assert_eq!(max_point_difference(&a, &b), 0.0);
    }

    #[test]
    fn uniform_image_has_near_zero_edges() {
        let config = NormalizeConfig::default();
        let img: RgbImage = ImageBuffer::from_pixel(64, 64, Rgb([128, 128, 128]));
        let edge = build_edge_map(&img, &config);
        for i in 0..edge.r.len() {
            assert!(edge.r[i].abs() < 1e-3);
        }
    }

    #[test]
    fn memory_footprint_matches_formula() {
        let config = NormalizeConfig::default();
        let img: RgbImage = ImageBuffer::from_pixel(32, 32, Rgb([1, 2, 3]));
        let edge = build_edge_map(&img, &config);
        assert_eq!(edge.estimated_memory_footprint(), 4 * 256 * 256 * 3);
    }
}
