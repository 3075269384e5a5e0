//! Value types for per-image visual data: the fingerprints the comparison
//! engine and the caches operate on.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::edgemap::{self, EdgeMap};
use crate::error::Result;
use crate::histogram::{self, LabHistograms, NUM_TILES};
use crate::normalize::{self, NormalizeConfig};

const TOO_LOW_RESOLUTION_THRESHOLD: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Resolution { width, height }
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }

    pub fn is_too_low(&self) -> bool {
        self.width.min(self.height) < TOO_LOW_RESOLUTION_THRESHOLD
    }
}

/// Whole-image, non-tiled visual data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleFingerprint {
    pub resolution: Resolution,
    pub had_alpha: bool,
    pub lab_histograms: LabHistograms,
}

impl SimpleFingerprint {
    pub fn resolution_too_low(&self) -> bool {
        self.resolution.is_too_low()
    }

    pub fn is_interesting(&self) -> bool {
        self.lab_histograms.is_interesting()
    }

    /// Exact constant the spec's data model gives for `VisualData`: one
    /// LabHistograms (3 * 256 * 4 bytes) plus bookkeeping.
    pub fn estimated_memory_footprint(&self) -> usize {
        4 * 256 * 3
    }
}

/// Per-tile visual data plus the DoG edge map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiledFingerprint {
    pub resolution: Resolution,
    pub had_alpha: bool,
    pub histograms: Vec<LabHistograms>,
    pub edge_map: EdgeMap,
}

impl TiledFingerprint {
    pub fn resolution_too_low(&self) -> bool {
        self.resolution.is_too_low()
    }

    /// Interesting iff any tile is interesting.
    pub fn is_interesting(&self) -> bool {
        self.histograms.iter().any(|h| h.is_interesting())
    }

    pub fn estimated_memory_footprint(&self) -> usize {
        self.histograms.len() * 4 * 256 * 3 + self.edge_map.estimated_memory_footprint()
    }
}

/// Compute the whole-image fingerprint.
pub fn compute_simple(img: &DynamicImage, config: &NormalizeConfig) -> Result<SimpleFingerprint> {
    if img.width() == 0 || img.height() == 0 {
        return Err(crate::error::Error::bad_input("zero-dimension image"));
    }

    let (rgb, had_alpha) = normalize::strip_alpha(img);
    let resolution = Resolution::new(rgb.width(), rgb.height());

    let blurred = normalize::blur_rgb(&rgb, config.artifact_blur_sigma);
    let resized = normalize::resize_area(&blurred, config.lab_histogram_resolution);
    let lab_pixels = normalize::rgb_to_lab_opencv(&resized);
    let lab_histograms = histogram::build_lab_histograms(&lab_pixels);

    Ok(SimpleFingerprint {
        resolution,
        had_alpha,
        lab_histograms,
    })
}

/// Compute the tiled fingerprint (Lab tiles + edge map).
pub fn compute_tiled(img: &DynamicImage, config: &NormalizeConfig) -> Result<TiledFingerprint> {
    if img.width() == 0 || img.height() == 0 {
        return Err(crate::error::Error::bad_input("zero-dimension image"));
    }

    let (rgb, had_alpha) = normalize::strip_alpha(img);
    let resolution = Resolution::new(rgb.width(), rgb.height());

    let blurred = normalize::blur_rgb(&rgb, config.artifact_blur_sigma);

    let (lw, lh) = config.lab_histogram_resolution;
    let lab_resized = normalize::resize_area(&blurred, (lw, lh));
    let lab_pixels = normalize::rgb_to_lab_opencv(&lab_resized);
    let histograms = histogram::build_tiled_lab_histograms(&lab_pixels, lw, lh);
    debug_assert_eq!(histograms.len(), NUM_TILES);

    let perceptual_wh = normalize::thumbnail_fit(
        (resolution.width, resolution.height),
        config.edge_perceptual_resolution,
    );
    let perceptual = normalize::resize_area(&blurred, perceptual_wh);
    let edge_map = edgemap::build_edge_map(&perceptual, config);

    Ok(TiledFingerprint {
        resolution,
        had_alpha,
        histograms,
        edge_map,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn test_image(w: u32, h: u32) -> DynamicImage {
        let mut img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::new(w, h);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = Rgb([((x * 3) % 256) as u8, ((y * 5) % 256) as u8, ((x + y) % 256) as u8]);
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn compute_simple_rejects_zero_dimension() {
        let img = DynamicImage::new_rgb8(0, 0);
        let config = NormalizeConfig::default();
        assert!(compute_simple(&img, &config).is_err());
    }

    #[test]
    fn compute_simple_resolution_too_low() {
        let img = test_image(16, 16);
        let config = NormalizeConfig::default();
        let fp = compute_simple(&img, &config).unwrap();
        assert!(fp.resolution_too_low());
    }

    #[test]
    fn compute_tiled_has_256_tiles() {
        let img = test_image(128, 128);
        let config = NormalizeConfig::default();
        let fp = compute_tiled(&img, &config).unwrap();
        assert_eq!(fp.histograms.len(), NUM_TILES);
    }

    #[test]
    fn compute_tiled_reports_alpha() {
        let mut rgba: ImageBuffer<image::Rgba<u8>, Vec<u8>> = ImageBuffer::new(64, 64);
        for p in rgba.pixels_mut() {
            *p = image::Rgba([10, 20, 30, 255]);
        }
        let img = DynamicImage::ImageRgba8(rgba);
        let config = NormalizeConfig::default();
        let fp = compute_tiled(&img, &config).unwrap();
        assert!(fp.had_alpha);
    }
}
