//! Dashboard Metrics
//!
//! Bounded scalars animated by the random walk. Each metric is owned by a
//! single periodic task (see `views`), renderers only read.

use crate::config::MetricSpec;
use crate::error::{EngineError, Result};
use crate::walk::{self, WalkMode};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Well-known metric ids
pub mod ids {
    pub const THREAT: &str = "threat_level";
    pub const WARNING: &str = "warning_level";
    pub const ENCRYPTION: &str = "encryption_level";
    pub const SECURITY: &str = "security_level";
}

/// A bounded scalar updated by random walk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: String,
    pub label: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub step_range: f64,
    pub mode: WalkMode,
}

impl Metric {
    pub fn from_spec(spec: &MetricSpec) -> Self {
        Self {
            id: spec.id.clone(),
            label: spec.label.clone(),
            value: walk::clamp(spec.initial, spec.min, spec.max),
            min: spec.min,
            max: spec.max,
            step_range: spec.step_range,
            mode: spec.mode,
        }
    }

    /// Advance one random-walk step and return the new value
    pub fn advance<R: Rng>(&mut self, rng: &mut R) -> f64 {
        self.value = walk::next_value(
            rng,
            self.value,
            self.min,
            self.max,
            self.step_range,
            self.mode,
        );
        self.value
    }

    /// Value as a 0-1 fraction of its range, for gauges
    pub fn fraction(&self) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        (self.value - self.min) / span
    }
}

/// Ordered collection of metrics keyed by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricBoard {
    metrics: Vec<Metric>,
}

impl MetricBoard {
    pub fn from_specs(specs: &[MetricSpec]) -> Self {
        Self {
            metrics: specs.iter().map(Metric::from_spec).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.id == id)
    }

    pub fn value(&self, id: &str) -> Option<f64> {
        self.get(id).map(|m| m.value)
    }

    /// Advance the named metric; an unknown id is an error for the owning task
    pub fn advance<R: Rng>(&mut self, id: &str, rng: &mut R) -> Result<f64> {
        let metric = self
            .metrics
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| EngineError::Config(format!("metric '{}' is not configured", id)))?;
        Ok(metric.advance(rng))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_board_from_defaults() {
        let board = MetricBoard::from_specs(&MetricSpec::defaults());
        assert_eq!(board.len(), 4);
        assert_eq!(board.value(ids::THREAT), Some(35.0));
        assert!(board.get("missing").is_none());
    }

    #[test]
    fn test_advance_respects_bounds() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut board = MetricBoard::from_specs(&MetricSpec::defaults());
        for _ in 0..300 {
            let v = board.advance(ids::ENCRYPTION, &mut rng).unwrap();
            assert!((80.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn test_advance_unknown_metric() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut board = MetricBoard::default();
        assert!(board.advance(ids::THREAT, &mut rng).is_err());
    }

    #[test]
    fn test_initial_value_clamped() {
        let mut spec = MetricSpec::defaults().remove(0);
        spec.initial = 400.0;
        let metric = Metric::from_spec(&spec);
        assert_eq!(metric.value, 100.0);
        assert_eq!(metric.fraction(), 1.0);
    }
}
