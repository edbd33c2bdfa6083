//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Get the signed angular distance between two angles.
///
/// This function will return the shortest signed distance from a to b
/// accounting for wrapping, so the result always lies in `[-pi, pi]`. The
/// inputs may be in any range, e.g. `[-pi, pi]` as produced by `atan2` or
/// `[0, 2pi]`.
pub fn get_ang_dist<T>(a: T, b: T) -> T
where
    T: Float,
{
    let tau_t = T::from(std::f64::consts::TAU).unwrap_or_else(T::nan);

    let c = rem_euclid(a - b, tau_t);
    let d = rem_euclid(b - a, tau_t);

    if c < d {
        -c
    } else {
        d
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// Due to floating point round-off the result can be equal to `rhs.abs()` when
/// `lhs` is much smaller than `rhs.abs()` in magnitude and negative.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_get_ang_dist() {
        const TAU: f64 = std::f64::consts::TAU;
        const PI: f64 = std::f64::consts::PI;

        assert_eq!(get_ang_dist(1f64, 2f64), 1f64);
        assert_eq!(get_ang_dist(2f64, 1f64), -1f64);
        assert_eq!(get_ang_dist(0f64, TAU), 0f64);
        assert_eq!(get_ang_dist(TAU, 0f64), 0f64);
        assert_eq!(get_ang_dist(1f64, TAU), -1f64);
        assert_eq!(get_ang_dist(TAU - 1f64, 1f64), 2f64);

        // Either side of the atan2 discontinuity are close together
        let d = get_ang_dist(PI - 0.1, -PI + 0.1);
        assert!((d - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_rem_euclid() {
        assert_eq!(rem_euclid(-1f64, 4f64), 3f64);
        assert_eq!(rem_euclid(5f64, 4f64), 1f64);
        assert_eq!(rem_euclid(5f64, -4f64), 1f64);
    }
}
