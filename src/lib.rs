//! Visual-duplicate fingerprinting, comparison and auto-resolution rule
//! engine for media libraries.
//!
//! The crate consumes already-decoded RGB(A) pixel buffers and produces
//! visual-duplicate verdicts; it does not read files, store thumbnails, or
//! own any UI. See `compare` for the comparison engine, `fingerprint` for
//! the value types it operates on, and `rules` for the auto-resolution
//! scheduler built on top of it.

pub mod cache;
pub mod compare;
pub mod edgemap;
pub mod error;
pub mod fingerprint;
pub mod histogram;
pub mod normalize;
pub mod pair;
pub mod persist;
pub mod rules;

pub use compare::{compare_simple, compare_tiled, CompareResult, Verdict};
pub use error::{Error, Result};
pub use fingerprint::{compute_simple, compute_tiled, Resolution, SimpleFingerprint, TiledFingerprint};
pub use normalize::NormalizeConfig;

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, Rgb};

    #[test]
    fn end_to_end_identical_copies_are_near_perfect() {
        let config = NormalizeConfig::default();
        let mut img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::new(256, 256);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = Rgb([((x * 2) % 256) as u8, ((y * 3) % 256) as u8, ((x + y) % 256) as u8]);
        }
        let dynamic = DynamicImage::ImageRgb8(img);

        let fp1 = compute_tiled(&dynamic, &config).unwrap();
        let fp2 = compute_tiled(&dynamic, &config).unwrap();

        let result = compare_tiled(&fp1, &fp2);
        assert!(result.are_similar);
        assert_eq!(result.class, Verdict::NearPerfect);
        assert_eq!(result.statement, "near-perfect visual duplicates");
    }

    #[test]
    fn end_to_end_caches_round_trip_a_fingerprint() {
        let config = NormalizeConfig::default();
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(128, 128, Rgb([10, 20, 30]));
        let dynamic = DynamicImage::ImageRgb8(img);
        let fp = compute_simple(&dynamic, &config).unwrap();
        let size = fp.estimated_memory_footprint();

        let simple_cache: cache::VisualDataCache<u64, SimpleFingerprint> =
            cache::VisualDataCache::new(cache::SIMPLE_CACHE_CAPACITY_BYTES);
        simple_cache.insert(1, fp.clone(), size).unwrap();
        let cached = simple_cache.get(&1).unwrap();
        assert_eq!(*cached, fp);
    }
}
