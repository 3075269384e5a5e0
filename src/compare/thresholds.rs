//! Tuned thresholds for the regional Lab-tile comparator. Kept as named
//! constants so they can be retuned without touching control flow.

pub const MAX_REGIONAL_SCORE: f64 = 0.010;
pub const MAX_MEAN: f64 = 0.003;
pub const MAX_VARIANCE: f64 = 3.5e-6;
pub const MAX_ABSOLUTE_SKEW_PULL: f64 = 50.0;

pub const VERY_GOOD_MAX_REGIONAL_SCORE: f64 = 0.004;
pub const VERY_GOOD_MAX_MEAN: f64 = 0.0015;
pub const VERY_GOOD_MAX_VARIANCE: f64 = 1.0e-6;
pub const VERY_GOOD_MAX_SKEW_PULL: f64 = 5.0;

pub const PERFECT_MAX_REGIONAL_SCORE: f64 = 0.001;
pub const PERFECT_MAX_MEAN: f64 = 0.0001;
pub const PERFECT_MAX_VARIANCE: f64 = 1.0e-6;
pub const PERFECT_MAX_SKEW_PULL: f64 = 1.5;

pub const HAS_PERFECT_TILE_SCORE_BOUND: f64 = 1e-7;
pub const MIXED_PERFECT_MAX_REGIONAL_SCORE_BOUND: f64 = 1e-4;
pub const MIXED_PERFECT_MIN_SKEW_PULL: f64 = 8.0;

pub const SIMPLE_MAX_SCORE: f64 = 0.003;

pub const EDGE_PERFECT_MAX_POINT_DIFFERENCE: f32 = 3.0;
pub const EDGE_VERY_GOOD_MAX_POINT_DIFFERENCE: f32 = 11.0;
pub const EDGE_MAX_POINT_DIFFERENCE: f32 = 15.0;
pub const EDGE_RUBBISH_MIN_POINT_DIFFERENCE: f32 = 45.0;

pub const ASPECT_TOLERANCE: f64 = 0.01;

pub const LAB_WEIGHT_L: f64 = 0.6;
pub const LAB_WEIGHT_A: f64 = 0.2;
pub const LAB_WEIGHT_B: f64 = 0.2;
