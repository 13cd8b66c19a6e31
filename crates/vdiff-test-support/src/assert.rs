//! Test assertions.

/// Tolerance used when comparing aggregated percentages.
pub const EPSILON: f64 = 1e-9;

/// Assert that two floating point values are equal within [`EPSILON`].
///
/// # Panics
///
/// Panics when the values differ by more than the tolerance.
#[track_caller]
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= EPSILON,
        "expected {expected}, got {actual}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assert_close_accepts_rounding_noise() {
        assert_close(0.1 + 0.2, 0.3);
    }

    #[test]
    #[should_panic(expected = "expected 0.3")]
    fn assert_close_rejects_real_differences() {
        assert_close(0.31, 0.3);
    }
}
