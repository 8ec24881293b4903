//! Small numeric helpers shared by the assessment and benchmark modules.
//! All functions are pure and operate on in-memory slices.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Ordinary-least-squares slope of `values` against their indices 0..n.
/// Fewer than two samples carry no trend information and yield 0.
pub fn ols_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// How steady a series is: 1 minus the coefficient of variation, clamped to
/// [0, 1]. A flat or smoothly rising series scores near 1, an erratic one
/// near 0. Non-positive means carry no usable signal and score 0.
pub fn consistency(values: &[f64]) -> f64 {
    let m = mean(values);
    if m <= 0.0 {
        return 0.0;
    }
    (1.0 - std_dev(values) / m).clamp(0.0, 1.0)
}

pub fn z_score(score: f64, avg: f64, std_dev: f64) -> f64 {
    if std_dev == 0.0 {
        return 0.0;
    }
    (score - avg) / std_dev
}

/// Linear stand-in for the normal CDF: 50 + 15z, clamped to [1, 99].
/// Coarse on purpose; consumers treat the percentile as an illustrative
/// label, not a certified metric.
pub fn z_score_to_percentile(z: f64) -> f64 {
    (50.0 + 15.0 * z).clamp(1.0, 99.0)
}
