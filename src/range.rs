//! Range lookup: bucket a scalar by its greatest lower threshold

use crate::error::{CalcError, Result};

/// Map `value` against parallel threshold/value arrays to a bucketed output.
///
/// Limit/value pairs are sorted by limit descending together, so unsorted
/// input buckets correctly; the result is the value whose limit is the
/// greatest limit <= `value`. `if_none` is returned when `value` is below
/// every limit, or when `value` is the "no value" sentinel (0 or NaN).
///
/// With limits `[0, 10, 20]` and values `[A, B, C]`, a value of 15 maps to
/// `B`.
pub fn value_for_range<T: Clone>(
    value: f64,
    limits: &[f64],
    values: &[T],
    if_none: &T,
) -> Result<T> {
    if limits.len() != values.len() {
        return Err(CalcError::argument_mismatch(format!(
            "Limits and values must have the same length. limits: {}, values: {}",
            limits.len(),
            values.len()
        )));
    }
    if value == 0.0 || value.is_nan() {
        return Ok(if_none.clone());
    }
    let mut pairs: Vec<(f64, &T)> = limits.iter().copied().zip(values.iter()).collect();
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));
    for (limit, bucket) in pairs {
        if value >= limit {
            return Ok(bucket.clone());
        }
    }
    Ok(if_none.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: [f64; 3] = [0.0, 10.0, 20.0];
    const VALUES: [&str; 3] = ["A", "B", "C"];

    #[test]
    fn test_buckets_by_greatest_lower_limit() {
        assert_eq!(
            value_for_range(15.0, &LIMITS, &VALUES, &"none").unwrap(),
            "B"
        );
        assert_eq!(value_for_range(5.0, &LIMITS, &VALUES, &"none").unwrap(), "A");
        assert_eq!(
            value_for_range(10.0, &LIMITS, &VALUES, &"none").unwrap(),
            "B"
        );
        assert_eq!(
            value_for_range(25.0, &LIMITS, &VALUES, &"none").unwrap(),
            "C"
        );
    }

    #[test]
    fn test_below_all_limits_returns_if_none() {
        let limits = [10.0, 20.0];
        let values = ["B", "C"];
        assert_eq!(
            value_for_range(5.0, &limits, &values, &"none").unwrap(),
            "none"
        );
        assert_eq!(
            value_for_range(-3.0, &LIMITS, &VALUES, &"none").unwrap(),
            "none"
        );
    }

    #[test]
    fn test_sentinel_inputs_return_if_none() {
        // 0 is treated as "no value" in the formula-facing contract
        assert_eq!(
            value_for_range(0.0, &LIMITS, &VALUES, &"none").unwrap(),
            "none"
        );
        assert_eq!(
            value_for_range(f64::NAN, &LIMITS, &VALUES, &"none").unwrap(),
            "none"
        );
    }

    #[test]
    fn test_unsorted_limits_carry_values_along() {
        let limits = [20.0, 0.0, 10.0];
        let values = ["C", "A", "B"];
        assert_eq!(
            value_for_range(15.0, &limits, &values, &"none").unwrap(),
            "B"
        );
        assert_eq!(
            value_for_range(3.0, &limits, &values, &"none").unwrap(),
            "A"
        );
    }

    #[test]
    fn test_length_mismatch_is_an_error() {
        let limits = [0.0, 10.0];
        let values = ["A"];
        let err = value_for_range(5.0, &limits, &values, &"none").unwrap_err();
        assert!(matches!(err, CalcError::ArgumentMismatch(_)));
    }
}
