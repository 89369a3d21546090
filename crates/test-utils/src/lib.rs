//! Shared test utilities for the overlay workspace.
//!
//! Synthetic forecast hours on a curvilinear (Lambert) or regular lat/lon
//! native grid, plus float assertions.
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod generators;

pub use generators::*;

/// Approximate floating-point equality.
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Two slices that agree cell by cell, treating NaN as equal to NaN.
#[macro_export]
macro_rules! assert_fields_eq {
    ($left:expr, $right:expr) => {{
        let left: &[f32] = &$left;
        let right: &[f32] = &$right;
        assert_eq!(left.len(), right.len(), "field lengths differ");
        for (i, (a, b)) in left.iter().zip(right.iter()).enumerate() {
            let same = (a.is_nan() && b.is_nan()) || a == b;
            assert!(same, "cell {} differs: {} vs {}", i, a, b);
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_assert_fields_eq_nan_aware() {
        assert_fields_eq!(vec![1.0, f32::NAN], vec![1.0, f32::NAN]);
    }

    #[test]
    #[should_panic(expected = "cell 1 differs")]
    fn test_assert_fields_eq_detects_difference() {
        assert_fields_eq!(vec![1.0, 2.0], vec![1.0, 3.0]);
    }
}
