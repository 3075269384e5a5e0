//! Normalized 1-D Wasserstein (Earth-Mover) distance between density
//! histograms, plus the population moments the regional comparator needs.

/// `WD(p,q) = sum(|cumsum(p - q)|) / (N - 1)`.
pub fn distance(p: &[f32; 256], q: &[f32; 256]) -> f64 {
    let mut cumsum = 0.0f64;
    let mut total = 0.0f64;
    for i in 0..256 {
        cumsum += (p[i] - q[i]) as f64;
        total += cumsum.abs();
    }
    total / 255.0
}

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

pub fn variance(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let m = mean(xs);
    xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64
}

/// Third-moment skewness; 0 when the population standard deviation is 0.
pub fn skewness(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let m = mean(xs);
    let var = variance(xs);
    let std = var.sqrt();
    if std == 0.0 {
        return 0.0;
    }
    let cubed_mean = xs.iter().map(|x| (x - m).powi(3)).sum::<f64>() / xs.len() as f64;
    cubed_mean / std.powi(3)
}
