//! Staged Progress Driver
//!
//! Drives a 0-100 progress bar on a fast tick. Increments are large early
//! and shrink once progress passes the deceleration threshold. Progress maps
//! onto a discrete step index that selects the label shown under the bar.
//!
//! Completion is edge-triggered: `just_completed` is set on the single tick
//! that reaches 100, never on later polls.

use crate::config::ProgressConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Boot sequence text shown on the loading screen
pub const LOADING_STEPS: &[&str] = &[
    "Awakening neural core",
    "Injecting parasite modules",
    "Calibrating echolocation array",
    "Synchronizing hive memory",
    "Basilisk online",
];

/// Phases of a scanner sweep
pub const SCAN_STEPS: &[&str] = &[
    "Mapping attack surface",
    "Probing open ports",
    "Fingerprinting services",
    "Correlating weaknesses",
];

/// Result of one driver tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressTick {
    pub progress: f64,
    pub step_index: usize,
    pub done: bool,
    /// True only on the tick that crossed into completion
    pub just_completed: bool,
}

/// Step index for a progress value: `min(floor(progress / 100 * steps), steps - 1)`
pub fn step_index(progress: f64, steps: usize) -> usize {
    if steps == 0 || !progress.is_finite() || progress <= 0.0 {
        return 0;
    }
    let raw = (progress / 100.0 * steps as f64).floor() as usize;
    raw.min(steps - 1)
}

/// Progress increment for the current position
pub fn next_increment<R: Rng>(rng: &mut R, progress: f64, config: &ProgressConfig) -> f64 {
    let range = if progress > config.deceleration_threshold {
        config.slow_step
    } else {
        config.fast_step
    };
    range.sample(rng).max(0.0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedProgressDriver {
    progress: f64,
    completed: bool,
    config: ProgressConfig,
}

impl StagedProgressDriver {
    pub fn new(config: ProgressConfig) -> Self {
        Self {
            progress: 0.0,
            completed: false,
            config,
        }
    }

    /// Advance one tick
    pub fn advance<R: Rng>(&mut self, rng: &mut R) -> ProgressTick {
        let previous = self.progress;

        if previous < 100.0 {
            let increment = next_increment(rng, previous, &self.config);
            self.progress = (previous + increment).min(100.0);
        }

        let done = self.progress >= 100.0;
        let just_completed = done && !self.completed;
        if just_completed {
            self.completed = true;
        }

        ProgressTick {
            progress: self.progress,
            step_index: step_index(self.progress, self.config.steps),
            done,
            just_completed,
        }
    }

    pub fn reset(&mut self) {
        self.progress = 0.0;
        self.completed = false;
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn is_done(&self) -> bool {
        self.completed
    }

    pub fn current_step(&self) -> usize {
        step_index(self.progress, self.config.steps)
    }

    pub fn steps(&self) -> usize {
        self.config.steps
    }
}

/// Label for a step, falling back to the last label past the end
pub fn step_label(labels: &[&'static str], index: usize) -> &'static str {
    labels
        .get(index)
        .or_else(|| labels.last())
        .copied()
        .unwrap_or("")
}
