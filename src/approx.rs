//! Approximate equality of floating point values and tensors.
//!
//! Two comparisons are offered:
//!
//! - [`ApproxEq::approx_eq`] rates the worst elementwise distance into an
//!   [`ApproxEquality`] tier
//! - [`ApproxEq::within`] checks every element against an explicit tolerance
//!
//! `NaN` matches `NaN`, and infinities match infinities of the same sign.
//! Tensors only compare equal when their shapes agree.

use crate::TensorFloat;
use crate::tensors::Tensor;

/// The max epsilon accepted on `f32`s.
pub const F32_MAX_ERROR: f32 = 1e-3;

/// The expected epsilon accepted on `f32`s.
pub const F32_AVG_ERROR: f32 = 1e-5;

/// The best expected epsilon accepted on `f32`s.
pub const F32_MIN_ERROR: f32 = 1e-6;

/// How close two values are, from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ApproxEquality {
    /// Within [`F32_MIN_ERROR`].
    Precise,
    /// Within [`F32_AVG_ERROR`].
    Partial,
    /// Within [`F32_MAX_ERROR`].
    Relative,
    /// Not equal.
    Scarce,
}

impl ApproxEquality {
    /// Whether the rating is better than [`ApproxEquality::Scarce`].
    pub fn is_equal(self) -> bool {
        self != Self::Scarce
    }

    fn rate(distance: f32) -> Self {
        if distance < F32_MIN_ERROR {
            Self::Precise
        } else if distance < F32_AVG_ERROR {
            Self::Partial
        } else if distance < F32_MAX_ERROR {
            Self::Relative
        } else {
            Self::Scarce
        }
    }
}

// 0 for matching NaNs and same-signed infinities, infinite for mismatches.
fn distance(a: f32, b: f32) -> f32 {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => 0.0,
        (true, false) | (false, true) => f32::INFINITY,
        _ if a == b => 0.0,
        _ => (a - b).abs(),
    }
}

/// Tolerance-based comparison.
pub trait ApproxEq<Rhs: ?Sized = Self> {
    /// Largest elementwise distance, or `None` when the operands cannot be
    /// compared (different lengths or shapes).
    fn max_distance(&self, rhs: &Rhs) -> Option<f32>;

    /// Rates the worst elementwise distance.
    fn approx_eq(&self, rhs: &Rhs) -> ApproxEquality {
        self.max_distance(rhs)
            .map_or(ApproxEquality::Scarce, ApproxEquality::rate)
    }

    /// Whether every element is within `tolerance`.
    fn within(&self, rhs: &Rhs, tolerance: f32) -> bool {
        self.max_distance(rhs).is_some_and(|d| d <= tolerance)
    }
}

impl ApproxEq for f32 {
    fn max_distance(&self, rhs: &Self) -> Option<f32> {
        Some(distance(*self, *rhs))
    }
}

impl ApproxEq for [f32] {
    fn max_distance(&self, rhs: &Self) -> Option<f32> {
        if self.len() != rhs.len() {
            return None;
        }
        Some(
            self.iter()
                .zip(rhs)
                .map(|(&a, &b)| distance(a, b))
                .fold(0.0, f32::max),
        )
    }
}

impl ApproxEq for Vec<f32> {
    fn max_distance(&self, rhs: &Self) -> Option<f32> {
        self.as_slice().max_distance(rhs.as_slice())
    }
}

impl ApproxEq for Tensor<TensorFloat> {
    fn max_distance(&self, rhs: &Self) -> Option<f32> {
        if self.shape() != rhs.shape() {
            return None;
        }
        self.data().max_distance(rhs.data())
    }
}

/// Asserts that two values are within a tolerance ([`F32_MAX_ERROR`] by
/// default) according to [`ApproxEq`].
///
/// ```rust
/// use seqgrad::assert_approx_eq;
///
/// assert_approx_eq!(0.1_f32 + 0.2, 0.3);
/// assert_approx_eq!([1.0_f32, f32::NAN][..], [1.00001, f32::NAN][..], 1e-4);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr $(,)?) => {
        $crate::assert_approx_eq!($left, $right, $crate::approx::F32_MAX_ERROR)
    };
    ($left:expr, $right:expr, $tolerance:expr $(,)?) => {{
        use $crate::approx::ApproxEq as _;
        let (left, right) = (&$left, &$right);
        let tolerance: f32 = $tolerance;
        if !left.within(right, tolerance) {
            panic!(
                "assertion failed: `left ≈ right` (tolerance {})\n  left: {:?}\n right: {:?}",
                tolerance, left, right
            );
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_the_worst_element() {
        let a = [1.0_f32, 2.0, 3.0];
        let b = [1.0_f32, 2.000_002, 3.0];
        assert_eq!(a[..].approx_eq(&b[..]), ApproxEquality::Partial);
        assert_eq!(a[..].approx_eq(&[1.0, 2.0, 4.0][..]), ApproxEquality::Scarce);
        assert!(a[..].approx_eq(&a[..]).is_equal());
    }

    #[test]
    fn nan_and_infinity_handling() {
        assert!(f32::NAN.within(&f32::NAN, 0.0));
        assert!(!f32::NAN.within(&1.0, 1e9));
        assert!(f32::INFINITY.within(&f32::INFINITY, 0.0));
        assert!(!f32::INFINITY.within(&f32::NEG_INFINITY, 1e9));
    }

    #[test]
    fn shapes_must_agree() {
        let a = Tensor::zeros(vec![2, 2]);
        let b = Tensor::zeros(vec![4]);
        assert_eq!(a.approx_eq(&b), ApproxEquality::Scarce);
    }
}
