//! Resolve two fingerprints to a visual-duplicate verdict.

pub mod thresholds;
pub mod wasserstein;

use crate::edgemap;
use crate::fingerprint::{SimpleFingerprint, TiledFingerprint};
use crate::histogram::LabHistograms;

/// Ordered confidence classes, NOT the lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verdict {
    Not = 0,
    Probably = 40,
    VeryProbably = 60,
    AlmostCertainly = 85,
    NearPerfect = 100,
}

impl Verdict {
    pub fn value(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareResult {
    pub are_similar: bool,
    pub class: Verdict,
    pub statement: &'static str,
}

impl CompareResult {
    fn new(class: Verdict, statement: &'static str) -> Self {
        CompareResult {
            are_similar: class != Verdict::Not,
            class,
            statement,
        }
    }
}

struct PreFilterInput {
    had_alpha: (bool, bool),
    resolution: ((u32, u32), (u32, u32)),
    too_low: (bool, bool),
}

fn run_pre_filters(input: PreFilterInput) -> Option<CompareResult> {
    let (alpha_1, alpha_2) = input.had_alpha;
    if alpha_1 || alpha_2 {
        return Some(if alpha_1 && alpha_2 {
            CompareResult::new(
                Verdict::Not,
                "cannot determine visual duplicates\n(they have transparency)",
            )
        } else {
            CompareResult::new(Verdict::Not, "not visual duplicates\n(one has transparency)")
        });
    }

    let ((w1, h1), (w2, h2)) = input.resolution;
    let r1 = w1 as f64 / h1.max(1) as f64;
    let r2 = w2 as f64 / h2.max(1) as f64;
    if !aspect_ratios_approximately_equal(r1, r2) {
        return Some(CompareResult::new(
            Verdict::Not,
            "not visual duplicates\n(different ratio)",
        ));
    }

    let (too_low_1, too_low_2) = input.too_low;
    if too_low_1 || too_low_2 {
        return Some(CompareResult::new(
            Verdict::Not,
            "cannot determine visual duplicates\n(too low resolution)",
        ));
    }

    None
}

/// Two aspect ratios are "approximately equal" within 1%.
pub fn aspect_ratios_approximately_equal(r1: f64, r2: f64) -> bool {
    let denom = r1.max(r2);
    if denom == 0.0 {
        return true;
    }
    (r1 - r2).abs() / denom <= thresholds::ASPECT_TOLERANCE
}

fn weighted_lab_score(a: &LabHistograms, b: &LabHistograms) -> f64 {
    thresholds::LAB_WEIGHT_L * wasserstein::distance(a.l(), b.l())
        + thresholds::LAB_WEIGHT_A * wasserstein::distance(a.a(), b.a())
        + thresholds::LAB_WEIGHT_B * wasserstein::distance(a.b(), b.b())
}

/// Simple (non-tiled) comparison: §4.5.4.
pub fn compare_simple(a: &SimpleFingerprint, b: &SimpleFingerprint) -> CompareResult {
    if let Some(result) = run_pre_filters(PreFilterInput {
        had_alpha: (a.had_alpha, b.had_alpha),
        resolution: (
            (a.resolution.width, a.resolution.height),
            (b.resolution.width, b.resolution.height),
        ),
        too_low: (a.resolution_too_low(), b.resolution_too_low()),
    }) {
        return result;
    }

    let interesting = a.is_interesting() || b.is_interesting();
    if !interesting {
        return CompareResult::new(Verdict::Not, "too simple to compare");
    }

    let score = weighted_lab_score(&a.lab_histograms, &b.lab_histograms);
    if score < thresholds::SIMPLE_MAX_SCORE {
        CompareResult::new(Verdict::Probably, "probably visual duplicates")
    } else {
        CompareResult::new(Verdict::Not, "not duplicates")
    }
}

fn edge_map_verdict(a: &TiledFingerprint, b: &TiledFingerprint) -> CompareResult {
    let m = edgemap::max_point_difference(&a.edge_map, &b.edge_map);
    if m < thresholds::EDGE_PERFECT_MAX_POINT_DIFFERENCE {
        CompareResult::new(Verdict::NearPerfect, "near-perfect visual duplicates")
    } else if m < thresholds::EDGE_VERY_GOOD_MAX_POINT_DIFFERENCE {
        CompareResult::new(Verdict::AlmostCertainly, "almost certainly visual duplicates")
    } else if m < thresholds::EDGE_MAX_POINT_DIFFERENCE {
        CompareResult::new(Verdict::VeryProbably, "very probably visual duplicates")
    } else if m > thresholds::EDGE_RUBBISH_MIN_POINT_DIFFERENCE {
        CompareResult::new(Verdict::Not, "not visual duplicates\n(alternate)")
    } else {
        CompareResult::new(
            Verdict::Not,
            "probably not visual duplicates\n(alternate/severe re-encode?)",
        )
    }
}

struct RegionalAggregate {
    max_regional_score: f64,
    mean_score: f64,
    variance: f64,
    absolute_skew_pull: f64,
    no_interesting_tiles: bool,
    has_perfect_interesting_tile: bool,
}

fn aggregate_tiles(a: &[LabHistograms], b: &[LabHistograms]) -> RegionalAggregate {
    let mut scores = Vec::with_capacity(a.len());
    let mut no_interesting_tiles = true;
    let mut has_perfect_interesting_tile = false;

    for (ha, hb) in a.iter().zip(b.iter()) {
        let interesting = ha.is_interesting() || hb.is_interesting();
        let score = weighted_lab_score(ha, hb);
        if interesting {
            no_interesting_tiles = false;
            if score < thresholds::HAS_PERFECT_TILE_SCORE_BOUND {
                has_perfect_interesting_tile = true;
            }
        }
        scores.push(score);
    }

    let max_regional_score = scores.iter().cloned().fold(f64::MIN, f64::max);
    let mean_score = wasserstein::mean(&scores);
    let variance = wasserstein::variance(&scores);
    let skew = wasserstein::skewness(&scores);
    let absolute_skew_pull = skew * max_regional_score * 1000.0;

    RegionalAggregate {
        max_regional_score,
        mean_score,
        variance,
        absolute_skew_pull,
        no_interesting_tiles,
        has_perfect_interesting_tile,
    }
}

fn lab_tile_verdict(a: &[LabHistograms], b: &[LabHistograms]) -> CompareResult {
    let agg = aggregate_tiles(a, b);

    if agg.no_interesting_tiles {
        return CompareResult::new(Verdict::Not, "too simple to compare");
    }

    let exceeds_regional = agg.max_regional_score > thresholds::MAX_REGIONAL_SCORE;
    let exceeds_mean = agg.mean_score > thresholds::MAX_MEAN;
    let exceeds_variance = agg.variance > thresholds::MAX_VARIANCE;
    let exceeds_skew = agg.absolute_skew_pull > thresholds::MAX_ABSOLUTE_SKEW_PULL;
    let mixed_perfect_and_non_perfect = agg.has_perfect_interesting_tile
        && agg.max_regional_score > thresholds::MIXED_PERFECT_MAX_REGIONAL_SCORE_BOUND
        && agg.absolute_skew_pull > thresholds::MIXED_PERFECT_MIN_SKEW_PULL;

    if mixed_perfect_and_non_perfect
        || exceeds_skew
        || exceeds_variance
        || exceeds_mean
        || exceeds_regional
    {
        let statement = if mixed_perfect_and_non_perfect {
            "probably not visual duplicates\n(small difference?)"
        } else if exceeds_skew {
            "not visual duplicates\n(alternate/watermark?)"
        } else if !exceeds_variance && (exceeds_mean || exceeds_regional) {
            "probably not visual duplicates\n(alternate/severe re-encode?)"
        } else {
            "probably not visual duplicates"
        };
        return CompareResult::new(Verdict::Not, statement);
    }

    let all_perfect = agg.max_regional_score < thresholds::PERFECT_MAX_REGIONAL_SCORE
        && agg.mean_score < thresholds::PERFECT_MAX_MEAN
        && agg.variance < thresholds::PERFECT_MAX_VARIANCE
        && agg.absolute_skew_pull < thresholds::PERFECT_MAX_SKEW_PULL;
    if all_perfect {
        return CompareResult::new(Verdict::NearPerfect, "near-perfect visual duplicates");
    }

    let all_very_good = agg.max_regional_score < thresholds::VERY_GOOD_MAX_REGIONAL_SCORE
        && agg.mean_score < thresholds::VERY_GOOD_MAX_MEAN
        && agg.variance < thresholds::VERY_GOOD_MAX_VARIANCE
        && agg.absolute_skew_pull < thresholds::VERY_GOOD_MAX_SKEW_PULL;
    if all_very_good {
        return CompareResult::new(Verdict::AlmostCertainly, "almost certainly visual duplicates");
    }

    CompareResult::new(Verdict::VeryProbably, "very probably visual duplicates")
}

/// Regional comparison: §4.5.3. Runs the edge-map comparator first, returns
/// it directly if negative, otherwise returns the more pessimistic of the
/// edge-map and Lab-tile verdicts.
pub fn compare_tiled(a: &TiledFingerprint, b: &TiledFingerprint) -> CompareResult {
    if let Some(result) = run_pre_filters(PreFilterInput {
        had_alpha: (a.had_alpha, b.had_alpha),
        resolution: (
            (a.resolution.width, a.resolution.height),
            (b.resolution.width, b.resolution.height),
        ),
        too_low: (a.resolution_too_low(), b.resolution_too_low()),
    }) {
        return result;
    }

    let edge_result = edge_map_verdict(a, b);
    if edge_result.class == Verdict::Not {
        return edge_result;
    }

    let lab_result = lab_tile_verdict(&a.histograms, &b.histograms);
    if lab_result.class <= edge_result.class {
        lab_result
    } else {
        edge_result
    }
}
