//! Small statistics helpers used by the metrics layer.
//!
//! Every function here is total: degenerate input (empty slices, zero
//! variance, mismatched lengths) yields a neutral value instead of NaN.

/// z-score of a two-sided 95% interval.
pub const Z_95: f64 = 1.96;

/// Arithmetic mean, `0.0` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean of the values produced by `f`, `0.0` when the iterator is empty.
pub fn mean_by<T>(items: impl IntoIterator<Item = T>, f: impl Fn(T) -> f64) -> f64 {
    let (sum, count) = items
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), item| (sum + f(item), count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Pearson correlation of two equally long series.
///
/// Returns `0.0` for fewer than two pairs, mismatched lengths, or when either
/// series has zero variance.
#[must_use]
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.len() < 2 {
        return 0.0;
    }

    let mean_x = mean(xs);
    let mean_y = mean(ys);

    let (cov, var_x, var_y) = xs.iter().zip(ys).fold(
        (0.0, 0.0, 0.0),
        |(cov, var_x, var_y), (x, y)| {
            let dx = x - mean_x;
            let dy = y - mean_y;
            (cov + dx * dy, var_x + dx * dx, var_y + dy * dy)
        },
    );

    let denominator = (var_x * var_y).sqrt();
    if denominator < f64::EPSILON {
        return 0.0;
    }
    cov / denominator
}

/// Wilson score interval for `successes` out of `n` trials, clamped to `[0, 1]`.
///
/// ```
/// use forecast_core::stats::{wilson_ci, Z_95};
///
/// let (lower, upper) = wilson_ci(50, 100, Z_95);
/// assert!(lower > 0.39 && lower < 0.41);
/// assert!(upper > 0.59 && upper < 0.61);
/// ```
#[must_use]
pub fn wilson_ci(successes: usize, n: usize, z: f64) -> (f64, f64) {
    if n == 0 {
        return (0.0, 0.0);
    }

    let n = n as f64;
    let p = successes as f64 / n;
    let z2 = z * z;

    let denominator = 1.0 + z2 / n;
    let center = p + z2 / (2.0 * n);
    let margin = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt();

    (
        ((center - margin) / denominator).max(0.0),
        ((center + margin) / denominator).min(1.0),
    )
}

/// Two-sided p-value for observing `successes` out of `n` when the true rate is `p0`.
///
/// Normal approximation with continuity correction. `1.0` when `n == 0`.
#[must_use]
pub fn binomial_test(successes: usize, n: usize, p0: f64) -> f64 {
    if n == 0 {
        return 1.0;
    }

    let n_f = n as f64;
    let sd = (n_f * p0 * (1.0 - p0)).sqrt();

    if sd < f64::EPSILON {
        let consistent = (p0 < f64::EPSILON && successes == 0)
            || (p0 > 1.0 - f64::EPSILON && successes == n);
        return if consistent { 1.0 } else { 0.0 };
    }

    let deviation = (successes as f64 - n_f * p0).abs() - 0.5;
    if deviation <= 0.0 {
        return 1.0;
    }

    (2.0 * (1.0 - normal_cdf(deviation / sd))).clamp(0.0, 1.0)
}

/// Standard normal CDF (Abramowitz & Stegun 26.2.17, error below 1e-5).
fn normal_cdf(x: f64) -> f64 {
    const P: f64 = 0.231_641_9;
    const B: [f64; 5] = [
        0.319_381_530,
        -0.356_563_782,
        1.781_477_937,
        -1.821_255_978,
        1.330_274_429,
    ];

    if x < 0.0 {
        return 1.0 - normal_cdf(-x);
    }

    let t = 1.0 / (1.0 + P * x);
    let poly = B.iter().rev().fold(0.0, |acc, b| (acc + b) * t);
    let density = (-x * x / 2.0).exp() / (2.0 * std::f64::consts::PI).sqrt();

    1.0 - density * poly
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert!((mean(&[1.0, 2.0, 3.0]) - 2.0).abs() < 1e-12);
        assert_eq!(mean_by(Vec::<f64>::new(), |x| x), 0.0);
    }

    #[test]
    fn pearson_perfect_and_inverse() {
        let xs = [0.1, 0.2, 0.3, 0.4];
        assert!((pearson_correlation(&xs, &[1.0, 2.0, 3.0, 4.0]) - 1.0).abs() < 1e-9);
        assert!((pearson_correlation(&xs, &[4.0, 3.0, 2.0, 1.0]) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn pearson_degenerate_inputs_are_zero() {
        assert_eq!(pearson_correlation(&[0.5], &[1.0]), 0.0);
        assert_eq!(pearson_correlation(&[0.5, 0.5, 0.5], &[1.0, 0.0, 1.0]), 0.0);
        assert_eq!(pearson_correlation(&[0.1, 0.2], &[1.0]), 0.0);
    }

    #[test]
    fn wilson_interval_brackets_rate() {
        let (lower, upper) = wilson_ci(8, 10, Z_95);
        assert!(lower < 0.8 && upper > 0.8);
        assert!(lower >= 0.0 && upper <= 1.0);
        assert_eq!(wilson_ci(0, 0, Z_95), (0.0, 0.0));
    }

    #[test]
    fn binomial_test_significance() {
        assert!(binomial_test(55, 100, 0.5) > 0.05);
        assert!(binomial_test(65, 100, 0.5) < 0.05);
        assert_eq!(binomial_test(0, 0, 0.5), 1.0);
        assert_eq!(binomial_test(50, 100, 0.5), 1.0);
    }

    #[test]
    fn normal_cdf_reference_points() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-5);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((normal_cdf(-1.96) - 0.025).abs() < 1e-3);
    }
}
