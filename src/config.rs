//! Engine Configuration
//!
//! Every magic number the dashboard relies on lives here: hunt costs, the
//! 0.8 success rate, the `[30, 95]` severity clamp, progress ranges and the
//! timer cadences of each view. All sections default to the values the
//! dashboard ships with, so a partial JSON file only overrides what it names.

use crate::error::{EngineError, Result};
use crate::walk::WalkMode;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Inclusive range a random increment is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepRange {
    pub min: f64,
    pub max: f64,
}

impl StepRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Draw a value uniformly from `[min, max]`. A degenerate range yields `min`.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        if !self.min.is_finite() || !self.max.is_finite() || self.max <= self.min {
            return self.min;
        }
        rng.random_range(self.min..=self.max)
    }

    /// Scale both ends by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.min * factor, self.max * factor)
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for the random source. `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Max entries kept in the activity log
    pub activity_log_capacity: usize,
    /// Initial autonomy level (0..=10)
    pub autonomy_level: u8,
    pub hunt: HuntConfig,
    pub loading: ProgressConfig,
    pub scan: ProgressConfig,
    pub evolution: EvolutionConfig,
    pub metrics: Vec<MetricSpec>,
    pub cadence: CadenceConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            activity_log_capacity: 100,
            autonomy_level: 5,
            hunt: HuntConfig::default(),
            loading: ProgressConfig::default(),
            scan: ProgressConfig {
                steps: 4,
                fast_step: StepRange::new(4.0, 12.0),
                slow_step: StepRange::new(1.0, 4.0),
                deceleration_threshold: 80.0,
            },
            evolution: EvolutionConfig::default(),
            metrics: MetricSpec::defaults(),
            cadence: CadenceConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the simulation meaningless
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.hunt.success_rate) {
            return Err(EngineError::Config(format!(
                "hunt.success_rate must be within [0, 1], got {}",
                self.hunt.success_rate
            )));
        }
        if self.hunt.severity_floor > self.hunt.severity_ceiling {
            return Err(EngineError::Config(
                "hunt.severity_floor exceeds hunt.severity_ceiling".to_string(),
            ));
        }
        if self.hunt.max_energy <= 0.0 {
            return Err(EngineError::Config(
                "hunt.max_energy must be positive".to_string(),
            ));
        }
        for metric in &self.metrics {
            if metric.min > metric.max {
                return Err(EngineError::Config(format!(
                    "metric '{}' has min > max",
                    metric.id
                )));
            }
        }
        if self.activity_log_capacity == 0 {
            return Err(EngineError::Config(
                "activity_log_capacity must be at least 1".to_string(),
            ));
        }
        for (name, section) in [("loading", &self.loading), ("scan", &self.scan)] {
            check_step(&format!("{}.fast_step", name), section.fast_step)?;
            check_step(&format!("{}.slow_step", name), section.slow_step)?;
            if !(0.0..=100.0).contains(&section.deceleration_threshold) {
                return Err(EngineError::Config(format!(
                    "{}.deceleration_threshold must be within [0, 100]",
                    name
                )));
            }
        }
        check_step("evolution.step", self.evolution.step)?;
        for (name, period_ms) in self.cadence.periods() {
            if period_ms == 0 {
                return Err(EngineError::Config(format!("cadence.{} must be at least 1", name)));
            }
        }
        Ok(())
    }
}

/// A step range must be finite, non-negative and able to make progress
fn check_step(name: &str, range: StepRange) -> Result<()> {
    if !range.min.is_finite() || !range.max.is_finite() {
        return Err(EngineError::Config(format!("{} must be finite", name)));
    }
    if range.min < 0.0 || range.min > range.max {
        return Err(EngineError::Config(format!(
            "{} must satisfy 0 <= min <= max, got [{}, {}]",
            name, range.min, range.max
        )));
    }
    if range.max <= 0.0 {
        return Err(EngineError::Config(format!("{} must have a positive max", name)));
    }
    Ok(())
}

/// Hunt / energy economy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HuntConfig {
    pub initial_energy: f64,
    pub max_energy: f64,
    /// Below this a hunt fails with "low energy"
    pub min_energy: f64,
    pub energy_cost: f64,
    /// Energy restored per regen tick
    pub regen_per_tick: f64,
    pub success_rate: f64,
    pub severity_floor: f64,
    pub severity_ceiling: f64,
    /// Scores up to this are low
    pub low_max: f64,
    /// Scores up to this are medium, above are high
    pub medium_max: f64,
}

impl Default for HuntConfig {
    fn default() -> Self {
        Self {
            initial_energy: 100.0,
            max_energy: 100.0,
            min_energy: 20.0,
            energy_cost: 20.0,
            regen_per_tick: 2.0,
            success_rate: 0.8,
            severity_floor: 30.0,
            severity_ceiling: 95.0,
            low_max: 40.0,
            medium_max: 70.0,
        }
    }
}

/// Staged progress bar tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    pub steps: usize,
    /// Increment while progress is at or below the threshold
    pub fast_step: StepRange,
    /// Increment once progress passes the threshold
    pub slow_step: StepRange,
    pub deceleration_threshold: f64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            steps: 5,
            fast_step: StepRange::new(2.0, 8.0),
            slow_step: StepRange::new(0.5, 2.0),
            deceleration_threshold: 80.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Progress gained per evolve tick at autonomy level 5
    pub step: StepRange,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            step: StepRange::new(1.0, 5.0),
        }
    }
}

/// Initial value and walk parameters of a dashboard metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSpec {
    pub id: String,
    pub label: String,
    pub initial: f64,
    pub min: f64,
    pub max: f64,
    pub step_range: f64,
    pub mode: WalkMode,
}

impl MetricSpec {
    fn new(
        id: &str,
        label: &str,
        initial: f64,
        bounds: (f64, f64),
        step: f64,
        mode: WalkMode,
    ) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            initial,
            min: bounds.0,
            max: bounds.1,
            step_range: step,
            mode,
        }
    }

    pub fn defaults() -> Vec<Self> {
        use crate::metrics::ids;
        vec![
            Self::new(ids::THREAT, "Threat Level", 35.0, (0.0, 100.0), 10.0, WalkMode::Symmetric),
            Self::new(ids::WARNING, "Warning Level", 20.0, (0.0, 100.0), 15.0, WalkMode::Symmetric),
            Self::new(
                ids::ENCRYPTION,
                "Encryption Level",
                92.0,
                (80.0, 100.0),
                2.0,
                WalkMode::Rising,
            ),
            Self::new(
                ids::SECURITY,
                "Security Level",
                85.0,
                (60.0, 100.0),
                5.0,
                WalkMode::Symmetric,
            ),
        ]
    }
}

/// Timer periods in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    pub loading_ms: u64,
    pub evolution_ms: u64,
    pub energy_regen_ms: u64,
    pub glitch_ms: u64,
    pub warning_ms: u64,
    pub terminal_ms: u64,
    pub threat_ms: u64,
    pub security_refresh_ms: u64,
    pub scan_ms: u64,
}

impl CadenceConfig {
    /// Every period with its field name
    pub fn periods(&self) -> [(&'static str, u64); 9] {
        [
            ("loading_ms", self.loading_ms),
            ("evolution_ms", self.evolution_ms),
            ("energy_regen_ms", self.energy_regen_ms),
            ("glitch_ms", self.glitch_ms),
            ("warning_ms", self.warning_ms),
            ("terminal_ms", self.terminal_ms),
            ("threat_ms", self.threat_ms),
            ("security_refresh_ms", self.security_refresh_ms),
            ("scan_ms", self.scan_ms),
        ]
    }
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            loading_ms: 120,
            evolution_ms: 1500,
            energy_regen_ms: 1000,
            glitch_ms: 2000,
            warning_ms: 3000,
            terminal_ms: 4000,
            threat_ms: 5000,
            security_refresh_ms: 60_000,
            scan_ms: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.hunt.success_rate, 0.8);
        assert_eq!(config.cadence.loading_ms, 120);
        assert_eq!(config.metrics.len(), 4);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{"seed": 7, "hunt": {"energy_cost": 35.0}}"#).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.hunt.energy_cost, 35.0);
        assert_eq!(config.hunt.min_energy, 20.0);
        assert_eq!(config.cadence.threat_ms, 5000);
    }

    #[test]
    fn test_invalid_success_rate_rejected() {
        let result = EngineConfig::from_json_str(r#"{"hunt": {"success_rate": 1.5}}"#);
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_stalling_step_ranges_rejected() {
        let stalled = [
            r#"{"loading": {"slow_step": {"min": 0.0, "max": 0.0}}}"#,
            r#"{"scan": {"fast_step": {"min": 8.0, "max": 2.0}}}"#,
            r#"{"scan": {"slow_step": {"min": -1.0, "max": 2.0}}}"#,
            r#"{"evolution": {"step": {"min": 0.0, "max": 0.0}}}"#,
            r#"{"loading": {"deceleration_threshold": 120.0}}"#,
        ];
        for raw in stalled {
            let result = EngineConfig::from_json_str(raw);
            assert!(matches!(result, Err(EngineError::Config(_))), "{} accepted", raw);
        }

        let mut config = EngineConfig::default();
        config.evolution.step = StepRange::new(f64::NAN, 5.0);
        assert!(config.validate().is_err());

        // a fixed step is fine
        let fixed = r#"{"loading": {"fast_step": {"min": 10.0, "max": 10.0}}}"#;
        assert!(EngineConfig::from_json_str(fixed).is_ok());
    }

    #[test]
    fn test_zero_cadence_rejected() {
        let result = EngineConfig::from_json_str(r#"{"cadence": {"threat_ms": 0}}"#);
        assert!(matches!(result, Err(EngineError::Config(msg)) if msg.contains("threat_ms")));

        let mut config = EngineConfig::default();
        for (name, _) in CadenceConfig::default().periods() {
            config.cadence = CadenceConfig::default();
            match name {
                "loading_ms" => config.cadence.loading_ms = 0,
                "evolution_ms" => config.cadence.evolution_ms = 0,
                "energy_regen_ms" => config.cadence.energy_regen_ms = 0,
                "glitch_ms" => config.cadence.glitch_ms = 0,
                "warning_ms" => config.cadence.warning_ms = 0,
                "terminal_ms" => config.cadence.terminal_ms = 0,
                "threat_ms" => config.cadence.threat_ms = 0,
                "security_refresh_ms" => config.cadence.security_refresh_ms = 0,
                _ => config.cadence.scan_ms = 0,
            }
            assert!(config.validate().is_err(), "{} = 0 accepted", name);
        }
    }

    #[test]
    fn test_step_range_sample() {
        let mut rng = StdRng::seed_from_u64(3);
        let range = StepRange::new(1.0, 5.0);
        for _ in 0..500 {
            let v = range.sample(&mut rng);
            assert!((1.0..=5.0).contains(&v));
        }
        assert_eq!(StepRange::new(2.0, 2.0).sample(&mut rng), 2.0);
        assert_eq!(StepRange::new(3.0, 1.0).sample(&mut rng), 3.0);
    }
}
