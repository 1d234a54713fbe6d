//! Bounded Random Walk
//!
//! Produces the "living dashboard" wobble: each update draws a delta and
//! clamps the result back into `[min, max]`. Values that are already out of
//! range are pulled back in silently.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Direction of the random delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkMode {
    /// Delta in `[-step, +step]`
    Symmetric,
    /// Delta in `[0, +step]`, for metrics that should only look like they climb
    Rising,
}

/// Clamp without panicking on inverted bounds or NaN.
/// An inverted pair resolves to `min`.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.min(max).max(min)
}

/// Next value of a bounded random walk.
///
/// A non-positive or non-finite `step_range` only clamps.
pub fn next_value<R: Rng>(
    rng: &mut R,
    value: f64,
    min: f64,
    max: f64,
    step_range: f64,
    mode: WalkMode,
) -> f64 {
    if !value.is_finite() {
        return clamp(min, min, max);
    }
    if !step_range.is_finite() || step_range <= 0.0 {
        return clamp(value, min, max);
    }

    let delta = match mode {
        WalkMode::Symmetric => rng.random_range(-step_range..=step_range),
        WalkMode::Rising => rng.random_range(0.0..=step_range),
    };

    clamp(value + delta, min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_walk_near_ceiling() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1_000 {
            let v = next_value(&mut rng, 95.0, 0.0, 100.0, 10.0, WalkMode::Symmetric);
            assert!((85.0..=100.0).contains(&v), "out of range: {}", v);
        }
    }

    #[test]
    fn test_walk_stays_in_bounds() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut value = 50.0;
            for _ in 0..500 {
                value = next_value(&mut rng, value, 10.0, 60.0, 25.0, WalkMode::Symmetric);
                assert!((10.0..=60.0).contains(&value));
            }
        }
    }

    #[test]
    fn test_rising_never_decreases() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut value = 0.0;
        for _ in 0..200 {
            let next = next_value(&mut rng, value, 0.0, 100.0, 3.0, WalkMode::Rising);
            assert!(next >= value);
            value = next;
        }
        assert!(value <= 100.0);
    }

    #[test]
    fn test_out_of_range_input_is_clamped() {
        let mut rng = StdRng::seed_from_u64(1);
        let v = next_value(&mut rng, 250.0, 0.0, 100.0, 0.0, WalkMode::Symmetric);
        assert_eq!(v, 100.0);
        let v = next_value(&mut rng, -40.0, 0.0, 100.0, 5.0, WalkMode::Rising);
        assert!((0.0..=5.0).contains(&v));
        let v = next_value(&mut rng, f64::NAN, 10.0, 100.0, 5.0, WalkMode::Symmetric);
        assert_eq!(v, 10.0);
    }

    #[test]
    fn test_clamp_inverted_bounds() {
        assert_eq!(clamp(5.0, 10.0, 0.0), 10.0);
        assert_eq!(clamp(f64::NAN, 1.0, 2.0), 1.0);
    }
}
