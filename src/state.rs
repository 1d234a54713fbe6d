//! Dashboard State
//!
//! The explicit state container every periodic task and action mutates.
//! Created when the engine is built, dropped with it; nothing is global.

use crate::allocation::ResourceAllocation;
use crate::config::{EngineConfig, StepRange};
use crate::core::{ActivityEntry, ActivityLog};
use crate::discovery::{Discovery, Hunter};
use crate::evolution::{Capability, EvolutionBook, default_capabilities};
use crate::metrics::{Metric, MetricBoard};
use crate::progress::{self, LOADING_STEPS, SCAN_STEPS, StagedProgressDriver};
use crate::views::View;
use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

pub const MAX_AUTONOMY: u8 = 10;

/// Lines cycled through by the fake terminal
pub const TERMINAL_COMMANDS: &[&str] = &[
    "basilisk --hunt --stealth",
    "inject parasite.so --pid 1337",
    "echo-map --range 10.0.0.0/8",
    "hive sync --force",
    "venom compile --target kernel",
    "shed-skin --wipe-traces",
];

/// Notable things that happened during a tick or an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Loading bar reached 100. Emitted once per load.
    LoadingComplete,
    ScanComplete { discovery: Discovery },
    CapabilityEvolved { name: String, level: u32, capped: bool },
}

pub struct DashboardState {
    pub rng: StdRng,
    pub epoch: DateTime<Utc>,
    pub metrics: MetricBoard,
    pub loading: StagedProgressDriver,
    pub scan: StagedProgressDriver,
    pub scanning: bool,
    pub hunter: Hunter,
    pub allocation: ResourceAllocation,
    pub evolution: EvolutionBook,
    pub evolution_step: StepRange,
    pub autonomy_level: u8,
    pub glitch: bool,
    pub terminal_index: usize,
    pub activity: ActivityLog,
    /// Events raised by tasks, drained by the engine after each advance
    pub events: Vec<EngineEvent>,
}

impl DashboardState {
    pub fn new(config: &EngineConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            rng,
            epoch: Utc::now(),
            metrics: MetricBoard::from_specs(&config.metrics),
            loading: StagedProgressDriver::new(config.loading.clone()),
            scan: StagedProgressDriver::new(config.scan.clone()),
            scanning: false,
            hunter: Hunter::new(config.hunt.clone()),
            allocation: ResourceAllocation::default(),
            evolution: EvolutionBook::new(default_capabilities()),
            evolution_step: config.evolution.step,
            autonomy_level: config.autonomy_level.min(MAX_AUTONOMY),
            glitch: false,
            terminal_index: 0,
            activity: ActivityLog::new(config.activity_log_capacity),
            events: Vec::new(),
        }
    }

    /// Wall-clock timestamp for a virtual time.
    ///
    /// Saturates at the largest representable instant instead of overflowing.
    pub fn timestamp(&self, now_ms: u64) -> DateTime<Utc> {
        i64::try_from(now_ms)
            .ok()
            .and_then(Duration::try_milliseconds)
            .and_then(|offset| self.epoch.checked_add_signed(offset))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Evolution speed multiplier: 0.5x at autonomy 0, 1x at 5, 1.5x at 10
    pub fn autonomy_factor(&self) -> f64 {
        0.5 + self.autonomy_level as f64 / MAX_AUTONOMY as f64
    }

    pub fn terminal_line(&self) -> &'static str {
        TERMINAL_COMMANDS[self.terminal_index % TERMINAL_COMMANDS.len()]
    }
}

/// Loading bar as rendered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressView {
    pub active: bool,
    pub progress: f64,
    pub step_index: usize,
    pub step_label: String,
    pub done: bool,
}

impl ProgressView {
    fn from_driver(driver: &StagedProgressDriver, labels: &[&'static str], active: bool) -> Self {
        let step_index = driver.current_step();
        Self {
            active,
            progress: driver.progress(),
            step_index,
            step_label: progress::step_label(labels, step_index).to_string(),
            done: driver.is_done(),
        }
    }
}

/// Everything a renderer needs, copied out of the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub running: bool,
    pub mounted_views: Vec<String>,
    pub metrics: Vec<Metric>,
    pub loading: ProgressView,
    pub scan: ProgressView,
    pub energy: f64,
    pub max_energy: f64,
    pub allocation: ResourceAllocation,
    pub autonomy_level: u8,
    pub capabilities: Vec<Capability>,
    pub discoveries: Vec<Discovery>,
    pub recent_activity: Vec<ActivityEntry>,
    pub glitch: bool,
    pub terminal_line: String,
}

impl Snapshot {
    pub(crate) fn capture(
        state: &DashboardState,
        time_ms: u64,
        running: bool,
        mounted: &[View],
    ) -> Self {
        let loading_active = mounted.contains(&View::Loading);
        Self {
            time_ms,
            timestamp: state.timestamp(time_ms),
            running,
            mounted_views: mounted.iter().map(|v| v.as_str().to_string()).collect(),
            metrics: state.metrics.iter().cloned().collect(),
            loading: ProgressView::from_driver(&state.loading, LOADING_STEPS, loading_active),
            scan: ProgressView::from_driver(&state.scan, SCAN_STEPS, state.scanning),
            energy: state.hunter.energy(),
            max_energy: state.hunter.max_energy(),
            allocation: state.allocation,
            autonomy_level: state.autonomy_level,
            capabilities: state.evolution.capabilities().to_vec(),
            discoveries: state.hunter.discoveries().to_vec(),
            recent_activity: state.activity.recent(10),
            glitch: state.glitch,
            terminal_line: state.terminal_line().to_string(),
        }
    }

    pub fn metric(&self, id: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.id == id)
    }

    pub fn capability(&self, id: &str) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_state_is_reproducible() {
        let config = EngineConfig {
            seed: Some(99),
            ..EngineConfig::default()
        };
        let mut a = DashboardState::new(&config);
        let mut b = DashboardState::new(&config);
        let ta = a.loading.advance(&mut a.rng);
        let tb = b.loading.advance(&mut b.rng);
        assert_eq!(ta, tb);
    }

    #[test]
    fn test_autonomy_factor() {
        let mut state = DashboardState::new(&EngineConfig::default());
        state.autonomy_level = 0;
        assert_eq!(state.autonomy_factor(), 0.5);
        state.autonomy_level = 10;
        assert_eq!(state.autonomy_factor(), 1.5);
    }

    #[test]
    fn test_terminal_line_wraps() {
        let mut state = DashboardState::new(&EngineConfig::default());
        state.terminal_index = TERMINAL_COMMANDS.len();
        assert_eq!(state.terminal_line(), TERMINAL_COMMANDS[0]);
    }

    #[test]
    fn test_timestamp_saturates_far_future() {
        let state = DashboardState::new(&EngineConfig::default());
        assert_eq!(state.timestamp(0), state.epoch);
        assert_eq!(state.timestamp(1_500), state.epoch + Duration::milliseconds(1_500));
        assert_eq!(state.timestamp(u64::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!(state.timestamp(i64::MAX as u64), DateTime::<Utc>::MAX_UTC);
        assert!(state.timestamp(10_000_000_000_000_000) >= state.epoch);
    }

    #[test]
    fn test_loading_bar_active_only_when_mounted() {
        let state = DashboardState::new(&EngineConfig::default());

        let unmounted = Snapshot::capture(&state, 0, true, &[View::Dashboard]);
        assert!(!unmounted.loading.active);
        assert_eq!(unmounted.mounted_views, vec!["dashboard".to_string()]);

        let mounted = Snapshot::capture(&state, 0, true, &[View::Dashboard, View::Loading]);
        assert!(mounted.loading.active);
    }
}
