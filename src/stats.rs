// Numeric helpers shared by the analytics engines.
//
// Every helper is total: empty input, a zero base or a non-finite value
// produce a defined number (or None), never NaN or Infinity.

/// Replace NaN and ±Infinity with 0.0
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Arithmetic mean (0.0 for an empty slice)
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().copied().map(finite_or_zero).sum();
    sum / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator)
///
/// Fewer than two values have no spread, so the result is 0.0.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values
        .iter()
        .map(|v| (finite_or_zero(*v) - m).powi(2))
        .sum();
    finite_or_zero((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Z-score of `value`, or 0.0 when there is no spread
pub fn z_score(value: f64, mean: f64, std_dev: f64) -> f64 {
    if std_dev > 0.0 {
        finite_or_zero((value - mean) / std_dev)
    } else {
        0.0
    }
}

/// Percentage change from `previous` to `current`
///
/// Returns None ("N/A") whenever the base is zero or negative.
pub fn percent_change(current: f64, previous: f64) -> Option<f64> {
    let current = finite_or_zero(current);
    let previous = finite_or_zero(previous);
    if previous > 0.0 {
        Some((current - previous) / previous * 100.0)
    } else {
        None
    }
}

/// Clamp a score into [0, 100]; non-finite scores become 0
pub fn clamp_score(score: f64) -> f64 {
    finite_or_zero(score).clamp(0.0, 100.0)
}

/// Render an optional percentage the way reports show it
pub fn format_percent(change: Option<f64>) -> String {
    match change {
        Some(pct) => format!("{}{:.1}%", if pct > 0.0 { "+" } else { "" }, pct),
        None => "N/A".to_string(),
    }
}

/// Least-squares line through (0, y0), (1, y1), ... as (slope, intercept)
pub fn linear_regression(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    if values.is_empty() {
        return (0.0, 0.0);
    }

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;
    for (i, y) in values.iter().enumerate() {
        let x = i as f64;
        let y = finite_or_zero(*y);
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }

    let denominator = n * sum_x2 - sum_x * sum_x;
    let slope = if values.len() > 1 && denominator != 0.0 {
        (n * sum_xy - sum_x * sum_y) / denominator
    } else {
        0.0
    };
    let intercept = (sum_y - slope * sum_x) / n;
    (finite_or_zero(slope), finite_or_zero(intercept))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std_dev_of_empty_input() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(sample_std_dev(&[]), 0.0);
    }

    #[test]
    fn test_single_value_has_no_spread() {
        assert_eq!(sample_std_dev(&[42.0]), 0.0);
        assert_eq!(z_score(42.0, 42.0, 0.0), 0.0);
    }

    #[test]
    fn test_sample_std_dev_uses_n_minus_one() {
        // mean 5, squared deviations sum to 32, 32 / 7
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let expected = (32.0_f64 / 7.0).sqrt();
        assert!((sample_std_dev(&values) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_percent_change_guards_zero_base() {
        assert_eq!(percent_change(500.0, 0.0), None);
        assert_eq!(percent_change(0.0, 0.0), None);
        assert_eq!(percent_change(500.0, -10.0), None);
        assert_eq!(percent_change(150.0, 100.0), Some(50.0));
        assert_eq!(percent_change(f64::NAN, 100.0), Some(-100.0));
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(150.0), 100.0);
        assert_eq!(clamp_score(-3.0), 0.0);
        assert_eq!(clamp_score(f64::INFINITY), 0.0);
        assert_eq!(clamp_score(55.5), 55.5);
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(None), "N/A");
        assert_eq!(format_percent(Some(12.345)), "+12.3%");
        assert_eq!(format_percent(Some(-4.0)), "-4.0%");
    }

    #[test]
    fn test_linear_regression() {
        let (slope, intercept) = linear_regression(&[10.0, 20.0, 30.0]);
        assert!((slope - 10.0).abs() < 1e-9);
        assert!((intercept - 10.0).abs() < 1e-9);

        assert_eq!(linear_regression(&[]), (0.0, 0.0));
        assert_eq!(linear_regression(&[7.0]), (0.0, 7.0));
    }
}
