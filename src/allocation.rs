//! Resource Allocation Normalizer
//!
//! The brain panel splits its attention between three buckets. Sliders send
//! partial updates; the normalizer merges them over the current split and
//! rescales so the three integers always sum to exactly 100.
//!
//! Rounding error goes into the last bucket (`evolution`). This is a simple
//! deterministic tie-break and it biases all rounding drift toward that one
//! bucket. When dumping the remainder there would push it below zero, the
//! remainder is taken from the largest bucket instead.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

pub const TOTAL: u32 = 100;

/// Percentage split across the three buckets (A, B, C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAllocation {
    pub hunting: u32,
    pub defense: u32,
    pub evolution: u32,
}

impl ResourceAllocation {
    pub fn sum(&self) -> u32 {
        self.hunting + self.defense + self.evolution
    }
}

impl Default for ResourceAllocation {
    fn default() -> Self {
        Self {
            hunting: 40,
            defense: 30,
            evolution: 30,
        }
    }
}

/// Partial update, unset fields keep their current value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialAllocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hunting: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defense: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evolution: Option<f64>,
}

impl PartialAllocation {
    pub fn is_empty(&self) -> bool {
        self.hunting.is_none() && self.defense.is_none() && self.evolution.is_none()
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 { value } else { 0.0 }
}

/// Merge `partial` over `current` and rescale to sum to exactly 100.
///
/// Fails with `InvalidAllocation` when the merged values sum to zero; callers
/// keep the prior allocation in that case.
pub fn normalize(
    partial: &PartialAllocation,
    current: &ResourceAllocation,
) -> Result<ResourceAllocation> {
    let merged = [
        sanitize(partial.hunting.unwrap_or(current.hunting as f64)),
        sanitize(partial.defense.unwrap_or(current.defense as f64)),
        sanitize(partial.evolution.unwrap_or(current.evolution as f64)),
    ];

    let sum: f64 = merged.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return Err(EngineError::InvalidAllocation(format!(
            "buckets sum to {}, cannot rescale",
            sum
        )));
    }

    let scale = TOTAL as f64 / sum;
    let mut rounded: [i64; 3] = merged.map(|v| (v * scale).round() as i64);

    let remainder = TOTAL as i64 - rounded.iter().sum::<i64>();
    if rounded[2] + remainder >= 0 {
        rounded[2] += remainder;
    } else {
        let largest = (0..3).max_by_key(|&i| rounded[i]).unwrap_or(0);
        rounded[largest] += remainder;
    }

    Ok(ResourceAllocation {
        hunting: rounded[0].max(0) as u32,
        defense: rounded[1].max(0) as u32,
        evolution: rounded[2].max(0) as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn current(h: u32, d: u32, e: u32) -> ResourceAllocation {
        ResourceAllocation {
            hunting: h,
            defense: d,
            evolution: e,
        }
    }

    #[test]
    fn test_partial_merge_and_rescale() {
        let partial = PartialAllocation {
            hunting: Some(50.0),
            ..Default::default()
        };
        let result = normalize(&partial, &current(10, 10, 80)).unwrap();
        assert_eq!(result, current(36, 7, 57));
        assert_eq!(result.sum(), 100);
    }

    #[test]
    fn test_already_normalized_is_unchanged() {
        let result = normalize(&PartialAllocation::default(), &current(40, 30, 30)).unwrap();
        assert_eq!(result, current(40, 30, 30));
    }

    #[test]
    fn test_remainder_goes_to_last_bucket() {
        // 33.33 each rounds to 33, remainder 1 lands in evolution
        let partial = PartialAllocation {
            hunting: Some(1.0),
            defense: Some(1.0),
            evolution: Some(1.0),
        };
        let result = normalize(&partial, &current(0, 0, 0)).unwrap();
        assert_eq!(result, current(33, 33, 34));
    }

    #[test]
    fn test_negative_remainder_with_empty_last_bucket() {
        // 50.5 -> 51, 49.5 -> 50, 0 -> 0: sum 101, evolution cannot absorb -1
        let partial = PartialAllocation {
            hunting: Some(50.5),
            defense: Some(49.5),
            evolution: Some(0.0),
        };
        let result = normalize(&partial, &current(0, 0, 0)).unwrap();
        assert_eq!(result.sum(), 100);
        assert_eq!(result, current(50, 50, 0));
    }

    #[test]
    fn test_all_zero_is_invalid() {
        let partial = PartialAllocation {
            hunting: Some(0.0),
            defense: Some(0.0),
            evolution: Some(0.0),
        };
        let result = normalize(&partial, &current(40, 30, 30));
        assert!(matches!(result, Err(EngineError::InvalidAllocation(_))));
    }

    #[test]
    fn test_negative_and_nan_inputs_treated_as_zero() {
        let partial = PartialAllocation {
            hunting: Some(-20.0),
            defense: Some(f64::NAN),
            evolution: None,
        };
        let result = normalize(&partial, &current(10, 10, 80)).unwrap();
        assert_eq!(result, current(0, 0, 100));
    }

    #[test]
    fn test_sum_invariant_over_random_inputs() {
        let mut rng = StdRng::seed_from_u64(77);
        for _ in 0..5_000 {
            let partial = PartialAllocation {
                hunting: rng.random_bool(0.7).then(|| rng.random_range(0.0..500.0)),
                defense: rng.random_bool(0.7).then(|| rng.random_range(0.0..500.0)),
                evolution: rng.random_bool(0.7).then(|| rng.random_range(0.0..500.0)),
            };
            let base = current(
                rng.random_range(1..100),
                rng.random_range(0..100),
                rng.random_range(0..100),
            );
            let result = normalize(&partial, &base).unwrap();
            assert_eq!(result.sum(), 100, "{:?} over {:?}", partial, base);
        }
    }
}
