//! Lab and RGB density histograms, tiled and simple.

use serde::{Deserialize, Serialize};

pub const NUM_BINS: usize = 256;
pub const TILES_PER_DIMENSION: u32 = 16;
pub const NUM_TILES: usize = (TILES_PER_DIMENSION * TILES_PER_DIMENSION) as usize;
const INTERESTING_NONZERO_BIN_THRESHOLD: usize = 24;

/// Three 256-bin density histograms (L, a, b). Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabHistograms {
    l: [f32; NUM_BINS],
    a: [f32; NUM_BINS],
    b: [f32; NUM_BINS],
}

impl LabHistograms {
    pub fn new(l: [f32; NUM_BINS], a: [f32; NUM_BINS], b: [f32; NUM_BINS]) -> Self {
        LabHistograms { l, a, b }
    }

    pub fn l(&self) -> &[f32; NUM_BINS] {
        &self.l
    }
    pub fn a(&self) -> &[f32; NUM_BINS] {
        &self.a
    }
    pub fn b(&self) -> &[f32; NUM_BINS] {
        &self.b
    }

    /// A flat-color filter: true iff more than 24 bins across all three
    /// channels are non-zero.
    pub fn is_interesting(&self) -> bool {
        let nonzero = self.l.iter().filter(|v| **v > 0.0).count()
            + self.a.iter().filter(|v| **v > 0.0).count()
            + self.b.iter().filter(|v| **v > 0.0).count();
        nonzero > INTERESTING_NONZERO_BIN_THRESHOLD
    }
}

/// Plain RGB density histograms, not wired into the verdict engine, kept as
/// a simple supplementary building block (see SPEC_FULL.md).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RgbHistograms {
    r: [f32; NUM_BINS],
    g: [f32; NUM_BINS],
    b: [f32; NUM_BINS],
}

impl RgbHistograms {
    pub fn r(&self) -> &[f32; NUM_BINS] {
        &self.r
    }
    pub fn g(&self) -> &[f32; NUM_BINS] {
        &self.g
    }
    pub fn b(&self) -> &[f32; NUM_BINS] {
        &self.b
    }
}

/// Tile coordinates in builder/comparator order: x outer, y inner. Both the
/// encoder and the comparator must walk tiles through this one function so
/// tile index `i` always names the same spatial patch.
pub fn tile_indices() -> impl Iterator<Item = (u32, u32)> {
    (0..TILES_PER_DIMENSION).flat_map(|x| (0..TILES_PER_DIMENSION).map(move |y| (x, y)))
}

fn density_histogram(values: impl Iterator<Item = f32>, count: &mut usize) -> [f32; NUM_BINS] {
    let mut bins = [0u32; NUM_BINS];
    let mut n = 0u32;
    for v in values {
        let bin = (v.clamp(0.0, 255.0) as usize).min(NUM_BINS - 1);
        bins[bin] += 1;
        n += 1;
    }
    *count = n as usize;
    let mut out = [0f32; NUM_BINS];
    if n == 0 {
        return out;
    }
    // Density-normalized so that sum(hist[i] * bin_width) == 1 with
    // bin_width == 1.
    for i in 0..NUM_BINS {
        out[i] = bins[i] as f32 / n as f32;
    }
    out
}

/// Build LabHistograms over the whole image.
pub fn build_lab_histograms(lab_pixels: &[[f32; 3]]) -> LabHistograms {
    let mut _n = 0usize;
    let l = density_histogram(lab_pixels.iter().map(|p| p[0]), &mut _n);
    let a = density_histogram(lab_pixels.iter().map(|p| p[1]), &mut _n);
    let b = density_histogram(lab_pixels.iter().map(|p| p[2]), &mut _n);
    LabHistograms::new(l, a, b)
}

/// Build the 256 per-tile LabHistograms of an image whose dimensions are
/// exact multiples of `TILES_PER_DIMENSION`. `lab_pixels` is row-major
/// (y * width + x), matching `image::RgbImage` pixel iteration.
pub fn build_tiled_lab_histograms(lab_pixels: &[[f32; 3]], width: u32, height: u32) -> Vec<LabHistograms> {
    debug_assert_eq!(width % TILES_PER_DIMENSION, 0);
    debug_assert_eq!(height % TILES_PER_DIMENSION, 0);
    let tile_w = width / TILES_PER_DIMENSION;
    let tile_h = height / TILES_PER_DIMENSION;

    tile_indices()
        .map(|(tx, ty)| {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let mut tile_pixels = Vec::with_capacity((tile_w * tile_h) as usize);
            for y in y0..y0 + tile_h {
                let row_start = (y * width + x0) as usize;
                tile_pixels.extend_from_slice(&lab_pixels[row_start..row_start + tile_w as usize]);
            }
            build_lab_histograms(&tile_pixels)
        })
        .collect()
}

/// Supplemented plain-RGB histogram builder (see SPEC_FULL.md).
pub fn rgb_histograms(rgb_pixels: &[[u8; 3]]) -> RgbHistograms {
    let mut n = 0usize;
    let r = density_histogram(rgb_pixels.iter().map(|p| p[0] as f32), &mut n);
    let g = density_histogram(rgb_pixels.iter().map(|p| p[1] as f32), &mut n);
    let b = density_histogram(rgb_pixels.iter().map(|p| p[2] as f32), &mut n);
    RgbHistograms { r, g, b }
}
