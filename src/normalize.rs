//! Strip alpha, blur, resample and color-convert a decoded image into the
//! shapes the histogram and edge-map builders expect.

use image::{DynamicImage, ImageBuffer, Luma, Rgb, RgbImage, Rgba};
use imageproc::filter::gaussian_blur_f32;

/// Tunables pulled out of control flow, mirroring the bundle-of-knobs-with-
/// a-`Default` shape used for hash tuning in the wider example corpus.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeConfig {
    pub artifact_blur_sigma: f32,
    pub lab_histogram_resolution: (u32, u32),
    pub edge_perceptual_resolution: (u32, u32),
    pub edge_dog_sigma: f32,
    pub tiles_per_dimension: u32,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        NormalizeConfig {
            artifact_blur_sigma: 0.8,
            lab_histogram_resolution: (1024, 1024),
            edge_perceptual_resolution: (2048, 2048),
            edge_dog_sigma: 10.0,
            tiles_per_dimension: 16,
        }
    }
}

/// Remove the alpha channel, reporting whether one was present.
pub fn strip_alpha(img: &DynamicImage) -> (RgbImage, bool) {
    match img {
        DynamicImage::ImageRgba8(_) | DynamicImage::ImageLumaA8(_) => {
            (img.to_rgb8(), true)
        }
        _ => {
            if img.color().has_alpha() {
                (img.to_rgb8(), true)
            } else {
                (img.to_rgb8(), false)
            }
        }
    }
}

/// Box-average resample to an exact target resolution. Each output pixel is
/// the area-weighted mean of the source pixels it overlaps; this is the area
/// filter, not a nearest/bilinear sampler, and is correct for both up- and
/// down-sampling.
pub fn resize_area(img: &RgbImage, target: (u32, u32)) -> RgbImage {
    let (target_w, target_h) = target;
    let (src_w, src_h) = img.dimensions();
    if (src_w, src_h) == (target_w, target_h) {
        return img.clone();
    }
    if target_w == 0 || target_h == 0 || src_w == 0 || src_h == 0 {
        return ImageBuffer::new(target_w, target_h);
    }

    // Horizontal pass, then vertical pass, each accumulating area overlap in
    // f64 to avoid compounding rounding error across two passes.
    let scale_x = src_w as f64 / target_w as f64;
    let scale_y = src_h as f64 / target_h as f64;

    let mut horiz: Vec<[f64; 3]> = vec![[0.0; 3]; (target_w * src_h) as usize];
    for y in 0..src_h {
        for ox in 0..target_w {
            let x0 = ox as f64 * scale_x;
            let x1 = x0 + scale_x;
            let (sum, weight) = accumulate_1d(img, y, x0, x1, true);
            let idx = (y * target_w + ox) as usize;
            horiz[idx] = [sum[0] / weight, sum[1] / weight, sum[2] / weight];
        }
    }

    let mut out = ImageBuffer::new(target_w, target_h);
    for ox in 0..target_w {
        for oy in 0..target_h {
            let y0 = oy as f64 * scale_y;
            let y1 = y0 + scale_y;
            let lo = y0.floor().max(0.0) as u32;
            let hi = (y1.ceil() as u32).min(src_h).max(lo + 1);
            let mut sum = [0.0f64; 3];
            let mut weight = 0.0f64;
            for sy in lo..hi {
                let overlap = overlap_1d(sy as f64, sy as f64 + 1.0, y0, y1);
                if overlap <= 0.0 {
                    continue;
                }
                let px = horiz[(sy * target_w + ox) as usize];
                sum[0] += px[0] * overlap;
                sum[1] += px[1] * overlap;
                sum[2] += px[2] * overlap;
                weight += overlap;
            }
            let px = if weight > 0.0 {
                [sum[0] / weight, sum[1] / weight, sum[2] / weight]
            } else {
                [0.0, 0.0, 0.0]
            };
            out.put_pixel(
                ox,
                oy,
                Rgb([
                    px[0].round().clamp(0.0, 255.0) as u8,
                    px[1].round().clamp(0.0, 255.0) as u8,
                    px[2].round().clamp(0.0, 255.0) as u8,
                ]),
            );
        }
    }
    out
}

fn overlap_1d(a0: f64, a1: f64, b0: f64, b1: f64) -> f64 {
    (a1.min(b1) - a0.max(b0)).max(0.0)
}

fn accumulate_1d(img: &RgbImage, y: u32, x0: f64, x1: f64, _horizontal: bool) -> ([f64; 3], f64) {
    let src_w = img.width();
    let lo = x0.floor().max(0.0) as u32;
    let hi = (x1.ceil() as u32).min(src_w).max(lo + 1);
    let mut sum = [0.0f64; 3];
    let mut weight = 0.0f64;
    for sx in lo..hi {
        let overlap = overlap_1d(sx as f64, sx as f64 + 1.0, x0, x1);
        if overlap <= 0.0 {
            continue;
        }
        let p = img.get_pixel(sx, y);
        sum[0] += p[0] as f64 * overlap;
        sum[1] += p[1] as f64 * overlap;
        sum[2] += p[2] as f64 * overlap;
        weight += overlap;
    }
    if weight == 0.0 {
        weight = 1.0;
    }
    (sum, weight)
}

/// Per-channel 2-D Gaussian blur with the given sigma.
pub fn blur_rgb(img: &RgbImage, sigma: f32) -> RgbImage {
    let (w, h) = img.dimensions();
    let mut channels: [ImageBuffer<Luma<f32>, Vec<f32>>; 3] = [
        ImageBuffer::new(w, h),
        ImageBuffer::new(w, h),
        ImageBuffer::new(w, h),
    ];
    for (x, y, p) in img.enumerate_pixels() {
        for c in 0..3 {
            channels[c].put_pixel(x, y, Luma([p[c] as f32]));
        }
    }

    let blurred: Vec<_> = channels
        .iter()
        .map(|chan| gaussian_blur_f32(chan, sigma))
        .collect();

    let mut out = ImageBuffer::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let r = blurred[0].get_pixel(x, y)[0].round().clamp(0.0, 255.0) as u8;
            let g = blurred[1].get_pixel(x, y)[0].round().clamp(0.0, 255.0) as u8;
            let b = blurred[2].get_pixel(x, y)[0].round().clamp(0.0, 255.0) as u8;
            out.put_pixel(x, y, Rgb([r, g, b]));
        }
    }
    out
}

/// Same blur, but keeps full floating-point precision (needed for the
/// Difference-of-Gaussians edge map, where subtracting two 8-bit-rounded
/// images would destroy the signal).
pub fn blur_rgb_f32(
    channels: &[ImageBuffer<Luma<f32>, Vec<f32>>; 3],
    sigma: f32,
) -> [ImageBuffer<Luma<f32>, Vec<f32>>; 3] {
    [
        gaussian_blur_f32(&channels[0], sigma),
        gaussian_blur_f32(&channels[1], sigma),
        gaussian_blur_f32(&channels[2], sigma),
    ]
}

pub fn rgb_to_f32_channels(img: &RgbImage) -> [ImageBuffer<Luma<f32>, Vec<f32>>; 3] {
    let (w, h) = img.dimensions();
    let mut channels: [ImageBuffer<Luma<f32>, Vec<f32>>; 3] = [
        ImageBuffer::new(w, h),
        ImageBuffer::new(w, h),
        ImageBuffer::new(w, h),
    ];
    for (x, y, p) in img.enumerate_pixels() {
        for c in 0..3 {
            channels[c].put_pixel(x, y, Luma([p[c] as f32]));
        }
    }
    channels
}

/// Largest size fitting inside `bound_wh` while preserving aspect ratio.
pub fn thumbnail_fit(src_wh: (u32, u32), bound_wh: (u32, u32)) -> (u32, u32) {
    let (sw, sh) = (src_wh.0 as f64, src_wh.1 as f64);
    let (bw, bh) = (bound_wh.0 as f64, bound_wh.1 as f64);
    if sw <= 0.0 || sh <= 0.0 {
        return (0, 0);
    }
    let scale = (bw / sw).min(bh / sh);
    let w = (sw * scale).round().max(1.0) as u32;
    let h = (sh * scale).round().max(1.0) as u32;
    (w, h)
}

/// OpenCV-style sRGB -> Lab conversion: L in [0,255], a/b in [0,255] (offset
/// by 128, not the conventional signed range). Every downstream threshold in
/// `compare::thresholds` is tuned against this normalization.
pub fn rgb_to_lab_opencv(img: &RgbImage) -> Vec<[f32; 3]> {
    img.pixels().map(|p| srgb_to_lab_opencv(*p)).collect()
}

fn srgb_to_lab_opencv(p: Rgb<u8>) -> [f32; 3] {
    let r = srgb_to_linear(p[0] as f32 / 255.0);
    let g = srgb_to_linear(p[1] as f32 / 255.0);
    let b = srgb_to_linear(p[2] as f32 / 255.0);

    // sRGB -> XYZ (D65)
    let x = r * 0.4124564 + g * 0.3575761 + b * 0.1804375;
    let y = r * 0.2126729 + g * 0.7151522 + b * 0.0721750;
    let z = r * 0.0193339 + g * 0.1191920 + b * 0.9503041;

    // Normalize against the D65 white point.
    let xn = x / 0.950456;
    let yn = y;
    let zn = z / 1.088754;

    let fx = lab_f(xn);
    let fy = lab_f(yn);
    let fz = lab_f(zn);

    let l = 116.0 * fy - 16.0;
    let a = 500.0 * (fx - fy);
    let b_ = 200.0 * (fy - fz);

    // OpenCV's 8-bit Lab packing: L *= 255/100, a/b += 128, all clamped.
    let l8 = (l * 255.0 / 100.0).clamp(0.0, 255.0);
    let a8 = (a + 128.0).clamp(0.0, 255.0);
    let b8 = (b_ + 128.0).clamp(0.0, 255.0);

    [l8, a8, b8]
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn lab_f(t: f32) -> f32 {
    const DELTA: f32 = 6.0 / 29.0;
    if t > DELTA.powi(3) {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

/// Pixels with a 4th channel are rejected upstream by `strip_alpha`; this
/// helper exists only so callers that already hold a raw buffer (e.g. a host
/// decoding straight to RGBA) can drop alpha without a full `DynamicImage`
/// round-trip.
pub fn drop_alpha_buffer(img: &ImageBuffer<Rgba<u8>, Vec<u8>>) -> RgbImage {
    let (w, h) = img.dimensions();
    let mut out = ImageBuffer::new(w, h);
    for (x, y, p) in img.enumerate_pixels() {
        out.put_pixel(x, y, Rgb([p[0], p[1], p[2]]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_alpha_reports_presence() {
        let rgba = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(4, 4, Rgba([1, 2, 3, 255])));
        let (rgb, had_alpha) = strip_alpha(&rgba);
        assert!(had_alpha);
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([1, 2, 3]));

        let rgb_only = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(4, 4, Rgb([9, 9, 9])));
        let (_, had_alpha) = strip_alpha(&rgb_only);
        assert!(!had_alpha);
    }

    #[test]
    fn resize_area_preserves_uniform_color() {
        let img: RgbImage = ImageBuffer::from_pixel(64, 64, Rgb([200, 100, 50]));
        let resized = resize_area(&img, (16, 16));
        for p in resized.pixels() {
            assert_eq!(*p, Rgb([200, 100, 50]));
        }
    }

    #[test]
    fn resize_area_identity() {
        let mut img: RgbImage = ImageBuffer::new(8, 8);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = Rgb([(x * 10) as u8, (y * 10) as u8, 5]);
        }
        let same = resize_area(&img, (8, 8));
        assert_eq!(img, same);
    }

    #[test]
    fn thumbnail_fit_preserves_aspect() {
        let fit = thumbnail_fit((1600, 900), (800, 800));
        assert_eq!(fit.0, 800);
        assert!(fit.1 <= 800);
        assert_eq!(fit.0 * 900, fit.1 * 1600);
    }

    #[test]
    fn lab_midgray_is_near_neutral_chroma() {
        let lab = srgb_to_lab_opencv(Rgb([128, 128, 128]));
        assert!((lab[1] - 128.0).abs() < 2.0);
        assert!((lab[2] - 128.0).abs() < 2.0);
        assert!(lab[0] > 0.0 && lab[0] < 255.0);
    }

    #[test]
    fn lab_black_and_white_bound_lightness() {
        let black = srgb_to_lab_opencv(Rgb([0, 0, 0]));
        let white = srgb_to_lab_opencv(Rgb([255, 255, 255]));
        assert!(black[0] < white[0]);
        assert!(white[0] > 250.0);
    }
}
