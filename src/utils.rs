/// Percent change from `prior` to `current`. Zero when there is no positive
/// prior-year base, so callers never see NaN or infinity.
pub fn growth_rate(prior: f64, current: f64) -> f64 {
    if prior > 0.0 {
        finite_or_zero((current - prior) / prior * 100.0)
    } else {
        0.0
    }
}

/// `part` as a percentage of `total`, zero when the total is not positive.
pub fn share_of(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        finite_or_zero(part / total * 100.0)
    } else {
        0.0
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().sum();
    Some(sum / values.len() as f64)
}

pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_rate() {
        assert!((growth_rate(100.0, 150.0) - 50.0).abs() < 1e-10);
        assert!((growth_rate(200.0, 100.0) + 50.0).abs() < 1e-10);
        assert_eq!(growth_rate(0.0, 500.0), 0.0);
        assert_eq!(growth_rate(-10.0, 500.0), 0.0);
    }

    #[test]
    fn test_share_of() {
        assert!((share_of(25.0, 100.0) - 25.0).abs() < 1e-10);
        assert_eq!(share_of(25.0, 0.0), 0.0);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
    }

    #[test]
    fn test_finite_or_zero() {
        assert_eq!(finite_or_zero(f64::NAN), 0.0);
        assert_eq!(finite_or_zero(f64::INFINITY), 0.0);
        assert_eq!(finite_or_zero(-3.5), -3.5);
    }
}
