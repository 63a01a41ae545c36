/// Linear annualization of a period return.
/// apr = period_return * 365 / days
pub fn annualize(period_return: f64, days: f64) -> f64 {
    if days <= 0.0 || !days.is_finite() {
        return f64::NAN;
    }
    period_return * 365.0 / days
}

/// Return of `value` relative to `principal`.
pub fn simple_return(value: f64, principal: f64) -> f64 {
    if principal == 0.0 {
        return f64::NAN;
    }
    value / principal - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annualize() {
        assert!((annualize(0.01, 36.5) - 0.1).abs() < 1e-12);
        assert!(annualize(0.01, 0.0).is_nan());
    }

    #[test]
    fn test_simple_return() {
        assert!((simple_return(110.0, 100.0) - 0.1).abs() < 1e-12);
        assert!(simple_return(1.0, 0.0).is_nan());
    }
}
