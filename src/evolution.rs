//! Evolution Bookkeeper
//!
//! Levelled capabilities of the Basilisk brain. While a capability is
//! evolving its progress climbs each tick; at 100 it levels up and resets.
//! Reaching `max_level` caps it for good.
//!
//! ```text
//!            toggle                 level-up to max
//!   Paused <────────> Evolving ─────────────────────> Capped (terminal)
//! ```

use crate::config::StepRange;
use crate::error::{EngineError, Result};
use crate::walk;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityState {
    Evolving,
    Paused,
    Capped,
}

/// A levelled, progress-tracked mock skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    pub id: String,
    pub name: String,
    pub current_level: u32,
    pub max_level: u32,
    pub evolving: bool,
    /// Progress toward the next level, `[0, 100]`
    pub progress: f64,
    pub last_evolved_at: Option<DateTime<Utc>>,
}

impl Capability {
    /// New capability; starts evolving unless already at its max level
    pub fn new(id: &str, name: &str, current_level: u32, max_level: u32, progress: f64) -> Self {
        let current_level = current_level.min(max_level);
        Self {
            id: id.to_string(),
            name: name.to_string(),
            current_level,
            max_level,
            evolving: current_level < max_level,
            progress: walk::clamp(progress, 0.0, 100.0),
            last_evolved_at: None,
        }
    }

    pub fn state(&self) -> CapabilityState {
        if self.current_level >= self.max_level {
            CapabilityState::Capped
        } else if self.evolving {
            CapabilityState::Evolving
        } else {
            CapabilityState::Paused
        }
    }
}

/// Result of ticking one capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickEffect {
    Unchanged,
    Progressed,
    LeveledUp { level: u32, capped: bool },
}

/// Advance one capability by an explicit, positive `delta`.
pub fn apply_progress(capability: &mut Capability, delta: f64, now: DateTime<Utc>) -> TickEffect {
    if !capability.evolving || capability.current_level >= capability.max_level {
        capability.evolving = false;
        return TickEffect::Unchanged;
    }

    let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
    capability.progress += delta;

    if capability.progress < 100.0 {
        return TickEffect::Progressed;
    }

    capability.progress = 0.0;
    capability.current_level = (capability.current_level + 1).min(capability.max_level);
    capability.last_evolved_at = Some(now);
    capability.evolving = capability.current_level < capability.max_level;

    TickEffect::LeveledUp {
        level: capability.current_level,
        capped: !capability.evolving,
    }
}

/// Advance one capability by a random amount drawn from `step`
pub fn tick<R: Rng>(
    rng: &mut R,
    capability: &mut Capability,
    step: StepRange,
    now: DateTime<Utc>,
) -> TickEffect {
    if !capability.evolving {
        return TickEffect::Unchanged;
    }
    let delta = step.sample(rng);
    apply_progress(capability, delta, now)
}

/// Starting set of capabilities
pub fn default_capabilities() -> Vec<Capability> {
    vec![
        Capability::new("neural-mimicry", "Neural Mimicry", 3, 10, 45.0),
        Capability::new("sonic-cloak", "Sonic Cloak", 5, 10, 10.0),
        Capability::new("venom-synthesis", "Venom Synthesis", 1, 5, 80.0),
        Capability::new("hive-link", "Hive Link", 7, 8, 60.0),
        Capability::new("predictive-strike", "Predictive Strike", 10, 10, 0.0),
    ]
}

/// All capabilities of a brain, ticked together
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvolutionBook {
    capabilities: Vec<Capability>,
}

impl EvolutionBook {
    pub fn new(capabilities: Vec<Capability>) -> Self {
        Self { capabilities }
    }

    /// Tick every capability, returning the names of those that levelled up
    pub fn tick_all<R: Rng>(
        &mut self,
        rng: &mut R,
        step: StepRange,
        now: DateTime<Utc>,
    ) -> Vec<(String, TickEffect)> {
        let mut level_ups = Vec::new();
        for capability in &mut self.capabilities {
            let effect = tick(rng, capability, step, now);
            if let TickEffect::LeveledUp { level, capped } = effect {
                info!(capability = %capability.id, level, capped, "Capability evolved");
                level_ups.push((capability.name.clone(), effect));
            }
        }
        level_ups
    }

    /// Flip Evolving <-> Paused. Capped capabilities refuse.
    pub fn toggle(&mut self, id: &str) -> Result<&Capability> {
        let capability = self
            .capabilities
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| EngineError::UnknownCapability(id.to_string()))?;

        if capability.state() == CapabilityState::Capped {
            return Err(EngineError::CapabilityCapped(id.to_string()));
        }

        capability.evolving = !capability.evolving;
        Ok(capability)
    }

    pub fn get(&self, id: &str) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.id == id)
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn evolving_count(&self) -> usize {
        self.capabilities
            .iter()
            .filter(|c| c.state() == CapabilityState::Evolving)
            .count()
    }
}
