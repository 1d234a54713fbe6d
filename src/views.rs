//! Dashboard Views
//!
//! Each view is a panel of the dashboard. Mounting a view registers its
//! periodic tasks with the scheduler under the view's tag, unmounting cancels
//! all of them at once.
//!
//! | View      | Task                       | Period  |
//! |-----------|----------------------------|---------|
//! | loading   | `loading.progress`         | 120ms   |
//! | dashboard | `ui.glitch`                | 2s      |
//! | dashboard | `metrics.warning`          | 3s      |
//! | dashboard | `terminal.command`         | 4s      |
//! | dashboard | `metrics.threat`           | 5s      |
//! | dashboard | `metrics.security_refresh` | 60s     |
//! | brain     | `capabilities.evolve`      | 1.5s    |
//! | brain     | `energy.regen`             | 1s      |
//! | scanner   | `scan.sweep`               | 500ms   |

use crate::config::CadenceConfig;
use crate::core::ActivityKind;
use crate::error::{EngineError, Result};
use crate::evolution::TickEffect;
use crate::metrics::ids;
use crate::state::{DashboardState, EngineEvent, TERMINAL_COMMANDS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Loading,
    Dashboard,
    Brain,
    Scanner,
}

impl View {
    pub const ALL: [View; 4] = [View::Loading, View::Dashboard, View::Brain, View::Scanner];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Loading => "loading",
            View::Dashboard => "dashboard",
            View::Brain => "brain",
            View::Scanner => "scanner",
        }
    }

    /// Periodic tasks this view registers while mounted
    pub fn tasks(&self, cadence: &CadenceConfig) -> Vec<TaskSpec> {
        match self {
            View::Loading => vec![TaskSpec::new(
                "loading.progress",
                cadence.loading_ms,
                loading_progress,
            )],
            View::Dashboard => vec![
                TaskSpec::new("ui.glitch", cadence.glitch_ms, glitch_toggle),
                TaskSpec::new("metrics.warning", cadence.warning_ms, warning_tick),
                TaskSpec::new("terminal.command", cadence.terminal_ms, terminal_command),
                TaskSpec::new("metrics.threat", cadence.threat_ms, threat_tick),
                TaskSpec::new(
                    "metrics.security_refresh",
                    cadence.security_refresh_ms,
                    security_refresh,
                ),
            ],
            View::Brain => vec![
                TaskSpec::new("capabilities.evolve", cadence.evolution_ms, evolve_capabilities),
                TaskSpec::new("energy.regen", cadence.energy_regen_ms, regenerate_energy),
            ],
            View::Scanner => vec![TaskSpec::new("scan.sweep", cadence.scan_ms, scan_sweep)],
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        View::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EngineError::Config(format!("unknown view '{}'", s)))
    }
}

/// Body of a periodic task
pub type TaskBody = fn(&mut DashboardState, u64) -> Result<()>;

/// A named periodic task and its period
#[derive(Clone, Copy)]
pub struct TaskSpec {
    pub name: &'static str,
    pub period_ms: u64,
    pub run: TaskBody,
}

impl TaskSpec {
    fn new(name: &'static str, period_ms: u64, run: TaskBody) -> Self {
        Self { name, period_ms, run }
    }
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("name", &self.name)
            .field("period_ms", &self.period_ms)
            .finish()
    }
}

// ============================================================================
// Task bodies
// ============================================================================

fn loading_progress(state: &mut DashboardState, now_ms: u64) -> Result<()> {
    let tick = state.loading.advance(&mut state.rng);
    if tick.just_completed {
        let ts = state.timestamp(now_ms);
        state.activity.push(ts, ActivityKind::System, "Loading complete");
        state.events.push(EngineEvent::LoadingComplete);
        info!(now_ms, "Loading complete");
    }
    Ok(())
}

fn glitch_toggle(state: &mut DashboardState, _now_ms: u64) -> Result<()> {
    state.glitch = !state.glitch;
    Ok(())
}

fn warning_tick(state: &mut DashboardState, _now_ms: u64) -> Result<()> {
    state.metrics.advance(ids::WARNING, &mut state.rng)?;
    state.metrics.advance(ids::ENCRYPTION, &mut state.rng)?;
    Ok(())
}

fn threat_tick(state: &mut DashboardState, _now_ms: u64) -> Result<()> {
    let threat = state.metrics.advance(ids::THREAT, &mut state.rng)?;
    debug!(threat, "Threat level moved");
    Ok(())
}

fn security_refresh(state: &mut DashboardState, _now_ms: u64) -> Result<()> {
    state.metrics.advance(ids::SECURITY, &mut state.rng)?;
    Ok(())
}

fn terminal_command(state: &mut DashboardState, _now_ms: u64) -> Result<()> {
    state.terminal_index = (state.terminal_index + 1) % TERMINAL_COMMANDS.len();
    Ok(())
}

fn evolve_capabilities(state: &mut DashboardState, now_ms: u64) -> Result<()> {
    let step = state.evolution_step.scaled(state.autonomy_factor());
    let ts = state.timestamp(now_ms);
    let level_ups = state.evolution.tick_all(&mut state.rng, step, ts);

    for (name, effect) in level_ups {
        if let TickEffect::LeveledUp { level, capped } = effect {
            let message = if capped {
                format!("{} reached max level {}", name, level)
            } else {
                format!("{} evolved to level {}", name, level)
            };
            state.activity.push(ts, ActivityKind::Evolution, message);
            state.events.push(EngineEvent::CapabilityEvolved { name, level, capped });
        }
    }
    Ok(())
}

fn regenerate_energy(state: &mut DashboardState, _now_ms: u64) -> Result<()> {
    let amount = state.hunter.regen_per_tick();
    state.hunter.regenerate(amount);
    Ok(())
}

fn scan_sweep(state: &mut DashboardState, now_ms: u64) -> Result<()> {
    if !state.scanning {
        return Ok(());
    }

    let tick = state.scan.advance(&mut state.rng);
    if !tick.just_completed {
        return Ok(());
    }

    let ts = state.timestamp(now_ms);
    let discovery = state.hunter.synthesize(&mut state.rng, ts);
    state.activity.push(
        ts,
        ActivityKind::ScanComplete,
        format!("Scan complete: {} ({})", discovery.title, discovery.severity.as_str()),
    );
    info!(id = %discovery.id, severity = discovery.severity.as_str(), "Scan complete");
    state.events.push(EngineEvent::ScanComplete { discovery });

    state.scanning = false;
    state.scan.reset();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn seeded_state() -> DashboardState {
        DashboardState::new(&EngineConfig {
            seed: Some(7),
            ..EngineConfig::default()
        })
    }

    #[test]
    fn test_view_parse() {
        assert_eq!("brain".parse::<View>().unwrap(), View::Brain);
        assert_eq!(" Scanner ".parse::<View>().unwrap(), View::Scanner);
        assert!("wallet".parse::<View>().is_err());
    }

    #[test]
    fn test_task_table() {
        let cadence = CadenceConfig::default();
        let dashboard: Vec<_> = View::Dashboard
            .tasks(&cadence)
            .iter()
            .map(|t| (t.name, t.period_ms))
            .collect();
        assert_eq!(
            dashboard,
            vec![
                ("ui.glitch", 2000),
                ("metrics.warning", 3000),
                ("terminal.command", 4000),
                ("metrics.threat", 5000),
                ("metrics.security_refresh", 60000),
            ]
        );
        assert_eq!(View::Loading.tasks(&cadence)[0].period_ms, 120);
        assert_eq!(View::Scanner.tasks(&cadence)[0].period_ms, 500);
        assert_eq!(View::Brain.tasks(&cadence).len(), 2);
    }

    #[test]
    fn test_loading_emits_once() {
        let mut state = seeded_state();
        for t in 1..=500 {
            loading_progress(&mut state, t * 120).unwrap();
        }
        let completions = state
            .events
            .iter()
            .filter(|e| **e == EngineEvent::LoadingComplete)
            .count();
        assert_eq!(completions, 1);
        assert!(state.loading.is_done());
    }

    #[test]
    fn test_scan_sweep_idle_when_not_scanning() {
        let mut state = seeded_state();
        for t in 1..=100 {
            scan_sweep(&mut state, t * 500).unwrap();
        }
        assert_eq!(state.scan.progress(), 0.0);
        assert!(state.hunter.discoveries().is_empty());
    }

    #[test]
    fn test_scan_sweep_completes_with_discovery() {
        let mut state = seeded_state();
        state.scanning = true;
        let energy = state.hunter.energy();

        let mut t = 0;
        while state.scanning && t < 1_000 {
            t += 1;
            scan_sweep(&mut state, t * 500).unwrap();
        }

        assert!(!state.scanning);
        assert_eq!(state.scan.progress(), 0.0);
        assert_eq!(state.hunter.discoveries().len(), 1);
        assert_eq!(state.hunter.energy(), energy);
        assert!(matches!(state.events.last(), Some(EngineEvent::ScanComplete { .. })));
    }

    #[test]
    fn test_metric_task_fails_without_metric() {
        let mut state = DashboardState::new(&EngineConfig {
            seed: Some(1),
            metrics: Vec::new(),
            ..EngineConfig::default()
        });
        assert!(threat_tick(&mut state, 5000).is_err());
        assert!(glitch_toggle(&mut state, 2000).is_ok());
    }

    #[test]
    fn test_higher_autonomy_evolves_faster() {
        let mut slow = seeded_state();
        let mut fast = seeded_state();
        slow.autonomy_level = 0;
        fast.autonomy_level = 10;

        for t in 1..=20 {
            evolve_capabilities(&mut slow, t * 1500).unwrap();
            evolve_capabilities(&mut fast, t * 1500).unwrap();
        }

        let progress = |s: &DashboardState| {
            s.evolution
                .capabilities()
                .iter()
                .map(|c| c.current_level as f64 * 100.0 + c.progress)
                .sum::<f64>()
        };
        assert!(progress(&fast) > progress(&slow));
    }
}
