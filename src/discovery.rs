//! Mock Discovery Generator
//!
//! Backs the "Start Hunt" button and the scanner panel. A hunt is gated on
//! energy, costs a fixed amount, and then either synthesizes a fictional
//! finding from fixed vocabularies or fails with a canned reason. Every hunt
//! outcome lands in the activity log.

use crate::config::HuntConfig;
use crate::core::{ActivityKind, ActivityLog, Severity, random_uuid};
use crate::error::{EngineError, Result};
use crate::walk;
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

pub const LOW_ENERGY_REASON: &str = "Hunt Failed - Low Energy";

/// Reasons an otherwise valid hunt comes back empty
pub const FAILURE_REASONS: &[&str] = &[
    "Target evaded detection",
    "Trail went cold",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryKind {
    Vulnerability,
    Backdoor,
    Exploit,
    DataLeak,
    Credentials,
}

impl DiscoveryKind {
    pub const ALL: [DiscoveryKind; 5] = [
        DiscoveryKind::Vulnerability,
        DiscoveryKind::Backdoor,
        DiscoveryKind::Exploit,
        DiscoveryKind::DataLeak,
        DiscoveryKind::Credentials,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryKind::Vulnerability => "vulnerability",
            DiscoveryKind::Backdoor => "backdoor",
            DiscoveryKind::Exploit => "exploit",
            DiscoveryKind::DataLeak => "data-leak",
            DiscoveryKind::Credentials => "credentials",
        }
    }

    fn titles(&self) -> &'static [&'static str] {
        match self {
            DiscoveryKind::Vulnerability => &[
                "Unpatched Kernel Module",
                "Stale TLS Configuration",
                "Exposed Debug Endpoint",
            ],
            DiscoveryKind::Backdoor => &[
                "Dormant Reverse Shell",
                "Rogue Cron Implant",
                "Shadow Admin Account",
            ],
            DiscoveryKind::Exploit => &[
                "Heap Spray Chain",
                "Deserialization Gadget",
                "Race Condition Primitive",
            ],
            DiscoveryKind::DataLeak => &[
                "Open Storage Bucket",
                "Verbose Error Trace",
                "Unredacted Log Stream",
            ],
            DiscoveryKind::Credentials => &[
                "Hardcoded API Token",
                "Reused Service Password",
                "Leaked SSH Key",
            ],
        }
    }

    fn descriptions(&self) -> &'static [&'static str] {
        match self {
            DiscoveryKind::Vulnerability => &[
                "Outdated component accepts crafted input without validation.",
                "Weak configuration leaves the perimeter partially open.",
            ],
            DiscoveryKind::Backdoor => &[
                "Persistent access channel hidden in a system service.",
                "Covert listener waiting for a wake-up signal.",
            ],
            DiscoveryKind::Exploit => &[
                "Reliable chain that escalates to elevated privileges.",
                "Memory corruption primitive reachable from user input.",
            ],
            DiscoveryKind::DataLeak => &[
                "Sensitive records reachable without authentication.",
                "Internal identifiers exposed through diagnostic output.",
            ],
            DiscoveryKind::Credentials => &[
                "Secret material found in plain text.",
                "Credential valid across several internal systems.",
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryStatus {
    Active,
    Resolved,
}

/// A synthesized fictional finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub kind: DiscoveryKind,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub status: DiscoveryStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Always `failed-hunt`
    pub kind: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl FailureRecord {
    fn new(reason: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: "failed-hunt".to_string(),
            reason: reason.to_string(),
            timestamp,
        }
    }

    pub fn is_low_energy(&self) -> bool {
        self.reason == LOW_ENERGY_REASON
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HuntOutcome {
    Discovered(Discovery),
    Failed(FailureRecord),
}

impl HuntOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, HuntOutcome::Discovered(_))
    }

    pub fn discovery(&self) -> Option<&Discovery> {
        match self {
            HuntOutcome::Discovered(d) => Some(d),
            HuntOutcome::Failed(_) => None,
        }
    }

    /// Message shown to the user
    pub fn message(&self) -> String {
        match self {
            HuntOutcome::Discovered(d) => {
                format!("Discovered {} ({}): {}", d.kind.as_str(), d.severity.as_str(), d.title)
            }
            HuntOutcome::Failed(f) => f.reason.clone(),
        }
    }
}

/// Hunter state: energy, running counters and the discoveries of this session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hunter {
    energy: f64,
    hunts: u64,
    discoveries_made: u64,
    /// Grows with every hunt, faster on success
    experience: f64,
    discoveries: Vec<Discovery>,
    config: HuntConfig,
}

impl Hunter {
    pub fn new(config: HuntConfig) -> Self {
        Self {
            energy: walk::clamp(config.initial_energy, 0.0, config.max_energy),
            hunts: 0,
            discoveries_made: 0,
            experience: 0.0,
            discoveries: Vec::new(),
            config,
        }
    }

    /// Attempt a hunt. Never errors: every failure is a `FailureRecord`.
    pub fn hunt<R: Rng>(
        &mut self,
        rng: &mut R,
        now: DateTime<Utc>,
        log: &mut ActivityLog,
    ) -> HuntOutcome {
        if self.energy < self.config.min_energy {
            debug!(energy = self.energy, required = self.config.min_energy, "Hunt refused");
            let record = FailureRecord::new(LOW_ENERGY_REASON, now);
            log.push(now, ActivityKind::FailedHunt, LOW_ENERGY_REASON);
            return HuntOutcome::Failed(record);
        }

        self.energy = (self.energy - self.config.energy_cost).max(0.0);
        self.hunts += 1;

        let success_rate = walk::clamp(self.config.success_rate, 0.0, 1.0);
        let outcome = if rng.random_bool(success_rate) {
            self.experience += 10.0;
            HuntOutcome::Discovered(self.synthesize(rng, now))
        } else {
            self.experience += 2.0;
            let reason = FAILURE_REASONS.choose(rng).copied().unwrap_or(FAILURE_REASONS[0]);
            HuntOutcome::Failed(FailureRecord::new(reason, now))
        };

        let kind = if outcome.is_success() {
            ActivityKind::Discovery
        } else {
            ActivityKind::FailedHunt
        };
        log.push(now, kind, outcome.message());
        info!(success = outcome.is_success(), energy = self.energy, "Hunt finished");

        outcome
    }

    /// Synthesize a discovery without spending energy (scanner sweeps)
    pub fn synthesize<R: Rng>(&mut self, rng: &mut R, now: DateTime<Utc>) -> Discovery {
        let kind = *DiscoveryKind::ALL
            .choose(rng)
            .unwrap_or(&DiscoveryKind::Vulnerability);
        let title = kind.titles().choose(rng).copied().unwrap_or("Unknown Finding");
        let description = kind.descriptions().choose(rng).copied().unwrap_or("");

        self.discoveries_made += 1;
        let severity = Severity::from_score(
            self.severity_score(),
            self.config.low_max,
            self.config.medium_max,
        );

        let discovery = Discovery {
            id: random_uuid(rng),
            title: title.to_string(),
            description: description.to_string(),
            kind,
            severity,
            timestamp: now,
            status: DiscoveryStatus::Active,
        };
        self.discoveries.push(discovery.clone());
        discovery
    }

    /// Blend of the discovery count and accumulated experience, clamped to the
    /// configured floor/ceiling
    pub fn severity_score(&self) -> f64 {
        let raw = self.discoveries_made as f64 * 4.0 + self.experience * 0.5 + 20.0;
        walk::clamp(raw, self.config.severity_floor, self.config.severity_ceiling)
    }

    /// Mark a discovery as fixed/uploaded
    pub fn resolve(&mut self, id: Uuid) -> Result<&Discovery> {
        let discovery = self
            .discoveries
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(EngineError::UnknownDiscovery(id))?;
        discovery.status = DiscoveryStatus::Resolved;
        Ok(discovery)
    }

    /// Restore energy up to the configured maximum
    pub fn regenerate(&mut self, amount: f64) -> f64 {
        if amount.is_finite() && amount > 0.0 {
            self.energy = (self.energy + amount).min(self.config.max_energy);
        }
        self.energy
    }

    pub fn regen_per_tick(&self) -> f64 {
        self.config.regen_per_tick
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn max_energy(&self) -> f64 {
        self.config.max_energy
    }

    pub fn hunts(&self) -> u64 {
        self.hunts
    }

    pub fn discoveries(&self) -> &[Discovery] {
        &self.discoveries
    }

    pub fn active_discoveries(&self) -> usize {
        self.discoveries
            .iter()
            .filter(|d| d.status == DiscoveryStatus::Active)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn hunter_with(energy: f64) -> Hunter {
        Hunter::new(HuntConfig {
            initial_energy: energy,
            ..HuntConfig::default()
        })
    }

    #[test]
    fn test_low_energy_gate() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut log = ActivityLog::new(10);
        let mut hunter = hunter_with(19.9);

        for _ in 0..5 {
            let outcome = hunter.hunt(&mut rng, Utc::now(), &mut log);
            match outcome {
                HuntOutcome::Failed(ref record) => {
                    assert!(record.is_low_energy());
                    assert_eq!(record.kind, "failed-hunt");
                }
                HuntOutcome::Discovered(_) => panic!("hunt should be refused"),
            }
            assert_eq!(hunter.energy(), 19.9);
        }
        assert_eq!(hunter.hunts(), 0);
        assert_eq!(log.len(), 5);
    }

    #[test]
    fn test_hunt_costs_energy_and_logs() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut log = ActivityLog::new(10);
        let mut hunter = hunter_with(100.0);

        hunter.hunt(&mut rng, Utc::now(), &mut log);
        assert_eq!(hunter.energy(), 80.0);
        assert_eq!(hunter.hunts(), 1);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_success_rate_roughly_holds() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut log = ActivityLog::new(100);
        let mut hunter = hunter_with(100.0);
        let mut successes = 0;
        let rounds = 2_000;

        for _ in 0..rounds {
            hunter.regenerate(100.0);
            let outcome = hunter.hunt(&mut rng, Utc::now(), &mut log);
            match outcome {
                HuntOutcome::Discovered(_) => successes += 1,
                HuntOutcome::Failed(record) => {
                    assert!(FAILURE_REASONS.contains(&record.reason.as_str()));
                }
            }
        }

        let rate = successes as f64 / rounds as f64;
        assert!(rate > 0.75 && rate < 0.85, "rate = {}", rate);
        assert_eq!(hunter.discoveries().len(), successes);
    }

    #[test]
    fn test_severity_score_clamped() {
        let mut hunter = hunter_with(100.0);
        assert_eq!(hunter.severity_score(), 30.0);

        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..100 {
            hunter.synthesize(&mut rng, Utc::now());
        }
        assert_eq!(hunter.severity_score(), 95.0);
        assert_eq!(hunter.discoveries().last().unwrap().severity, Severity::High);
    }

    #[test]
    fn test_resolve_discovery() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut hunter = hunter_with(100.0);
        let discovery = hunter.synthesize(&mut rng, Utc::now());
        assert_eq!(hunter.active_discoveries(), 1);

        let resolved = hunter.resolve(discovery.id).unwrap();
        assert_eq!(resolved.status, DiscoveryStatus::Resolved);
        assert_eq!(hunter.active_discoveries(), 0);

        let missing = Uuid::nil();
        assert!(matches!(hunter.resolve(missing), Err(EngineError::UnknownDiscovery(_))));
    }

    #[test]
    fn test_regenerate_caps_at_max() {
        let mut hunter = hunter_with(90.0);
        assert_eq!(hunter.regenerate(25.0), 100.0);
        assert_eq!(hunter.regenerate(-5.0), 100.0);
    }
}
