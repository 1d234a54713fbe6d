//! Basilisk Engine
//!
//! Owns the dashboard state, the interval scheduler and the subscribers.
//! Timer firings and user actions are the only two ways state changes; both
//! run to completion on `&mut self` and then notify subscribers with a fresh
//! snapshot.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     BasiliskEngine                       │
//! │  ┌─────────────┐   ┌──────────────────┐  ┌────────────┐  │
//! │  │   Views     │──▶│ IntervalScheduler│  │  Actions   │  │
//! │  │ (mount/     │   │ (virtual clock)  │  │ hunt/scan/ │  │
//! │  │  unmount)   │   └────────┬─────────┘  │ allocate.. │  │
//! │  └─────────────┘            │            └─────┬──────┘  │
//! │                             ▼                  ▼         │
//! │                   ┌──────────────────────────────┐       │
//! │                   │       DashboardState         │       │
//! │                   └──────────────┬───────────────┘       │
//! │                                  ▼                       │
//! │                       Snapshot ─▶ subscribers            │
//! └──────────────────────────────────────────────────────────┘
//! ```

use crate::allocation::{self, PartialAllocation, ResourceAllocation};
use crate::config::EngineConfig;
use crate::core::ActivityKind;
use crate::discovery::{Discovery, HuntOutcome};
use crate::error::{EngineError, Result};
use crate::evolution::{Capability, CapabilityState};
use crate::scheduler::{IntervalScheduler, TaskInfo, task};
use crate::state::{DashboardState, EngineEvent, MAX_AUTONOMY, Snapshot};
use crate::views::View;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Engine running state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Stopped,
    Running,
    Paused,
}

/// Engine statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub tick_count: u64,
    pub firings: u64,
    pub failed_firings: u64,
    /// Every `start_hunt` call on a running engine, low-energy refusals included
    pub hunt_attempts: u64,
    pub discoveries: u64,
}

/// What a single `advance` did
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickSummary {
    pub time_ms: u64,
    pub fired: u64,
    pub failed: u64,
    /// Missed periods dropped because the window was too long to replay
    pub skipped: u64,
    pub events: Vec<EngineEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

type Subscriber = Box<dyn FnMut(&Snapshot) + Send>;

pub struct BasiliskEngine {
    config: EngineConfig,
    state: EngineState,
    dashboard: DashboardState,
    scheduler: IntervalScheduler<DashboardState>,
    mounted: Vec<View>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    stats: EngineStats,
}

impl BasiliskEngine {
    /// Create a stopped engine with no views mounted
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let dashboard = DashboardState::new(&config);

        Ok(Self {
            config,
            state: EngineState::Stopped,
            dashboard,
            scheduler: IntervalScheduler::new(),
            mounted: Vec::new(),
            subscribers: Vec::new(),
            next_subscription: 1,
            stats: EngineStats::default(),
        })
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    pub fn start(&mut self) {
        if self.state != EngineState::Running {
            info!(now_ms = self.scheduler.now_ms(), "Engine started");
            self.state = EngineState::Running;
        }
    }

    /// Stop and tear down every mounted view
    pub fn stop(&mut self) {
        let cancelled = self.scheduler.cancel_all();
        self.mounted.clear();
        self.state = EngineState::Stopped;
        info!(cancelled, "Engine stopped");
    }

    pub fn pause(&mut self) {
        if self.state == EngineState::Running {
            self.state = EngineState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == EngineState::Paused {
            self.state = EngineState::Running;
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Advance the virtual clock by `delta_ms`, firing every due task.
    /// A no-op unless the engine is running.
    pub fn advance(&mut self, delta_ms: u64) -> TickSummary {
        if self.state != EngineState::Running {
            return TickSummary {
                time_ms: self.scheduler.now_ms(),
                ..TickSummary::default()
            };
        }

        let report = self.scheduler.advance(delta_ms, &mut self.dashboard);
        let events = std::mem::take(&mut self.dashboard.events);

        self.stats.tick_count += 1;
        self.stats.firings += report.fired;
        self.stats.failed_firings += report.failed;
        self.stats.discoveries += events
            .iter()
            .filter(|e| matches!(e, EngineEvent::ScanComplete { .. }))
            .count() as u64;

        if report.total() > 0 {
            self.notify();
        }

        TickSummary {
            time_ms: self.scheduler.now_ms(),
            fired: report.fired,
            failed: report.failed,
            skipped: report.skipped,
            events,
        }
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Register the view's tasks. Mounting an already mounted view does nothing.
    pub fn mount_view(&mut self, view: View) -> Result<usize> {
        if self.mounted.contains(&view) {
            return Ok(0);
        }
        if view == View::Loading {
            self.dashboard.loading.reset();
        }

        let specs = view.tasks(&self.config.cadence);
        for spec in &specs {
            if let Err(e) = self
                .scheduler
                .schedule(view.as_str(), spec.name, spec.period_ms, task(spec.run))
            {
                self.scheduler.cancel_view(view.as_str());
                return Err(e);
            }
        }

        self.mounted.push(view);
        info!(view = %view, tasks = specs.len(), "View mounted");
        Ok(specs.len())
    }

    /// Cancel every task the view registered
    pub fn unmount_view(&mut self, view: View) -> usize {
        self.mounted.retain(|v| *v != view);
        let cancelled = self.scheduler.cancel_view(view.as_str());
        if cancelled > 0 {
            info!(view = %view, cancelled, "View unmounted");
        }
        cancelled
    }

    pub fn mounted_views(&self) -> &[View] {
        &self.mounted
    }

    pub fn tasks(&self) -> Vec<TaskInfo> {
        self.scheduler.tasks()
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Hunt for a discovery. Low energy comes back as a failed outcome.
    pub fn start_hunt(&mut self) -> Result<HuntOutcome> {
        self.ensure_running()?;
        let now = self.now();
        let dashboard = &mut self.dashboard;
        let outcome = dashboard
            .hunter
            .hunt(&mut dashboard.rng, now, &mut dashboard.activity);

        self.stats.hunt_attempts += 1;
        if outcome.is_success() {
            self.stats.discoveries += 1;
        }
        self.notify();
        Ok(outcome)
    }

    /// Start or abort a scanner sweep. Returns whether a sweep is now running.
    pub fn toggle_scan(&mut self) -> Result<bool> {
        self.ensure_running()?;
        let now = self.now();

        if self.dashboard.scanning {
            self.dashboard.scanning = false;
            self.dashboard.scan.reset();
            self.dashboard
                .activity
                .push(now, ActivityKind::System, "Scan aborted");
            self.notify();
            return Ok(false);
        }

        let required = self.config.hunt.min_energy;
        let available = self.dashboard.hunter.energy();
        if available < required {
            self.dashboard
                .activity
                .push(now, ActivityKind::FailedHunt, "Scan Failed - Low Energy");
            self.notify();
            return Err(EngineError::InsufficientResource {
                required,
                available,
            });
        }

        self.dashboard.scanning = true;
        self.dashboard.scan.reset();
        self.dashboard
            .activity
            .push(now, ActivityKind::System, "Scan started");
        if !self.mounted.contains(&View::Scanner) {
            debug!("Scan started without the scanner view mounted");
        }
        self.notify();
        Ok(true)
    }

    /// Merge a partial split and rebalance to 100. Errors keep the prior split.
    pub fn set_resource_allocation(
        &mut self,
        partial: PartialAllocation,
    ) -> Result<ResourceAllocation> {
        let next = allocation::normalize(&partial, &self.dashboard.allocation)?;
        self.dashboard.allocation = next;

        let now = self.now();
        self.dashboard.activity.push(
            now,
            ActivityKind::Allocation,
            format!(
                "Resources rebalanced: hunting {}%, defense {}%, evolution {}%",
                next.hunting, next.defense, next.evolution
            ),
        );
        self.notify();
        Ok(next)
    }

    /// Set autonomy, clamped to `0..=10`. Returns the applied level.
    pub fn set_autonomy_level(&mut self, level: i64) -> u8 {
        let applied = level.clamp(0, MAX_AUTONOMY as i64) as u8;
        if applied as i64 != level {
            warn!(requested = level, applied, "Autonomy level clamped");
        }
        self.dashboard.autonomy_level = applied;

        let now = self.now();
        self.dashboard.activity.push(
            now,
            ActivityKind::Autonomy,
            format!("Autonomy level set to {}", applied),
        );
        self.notify();
        applied
    }

    /// Pause or resume evolution of one capability
    pub fn toggle_capability_evolution(&mut self, id: &str) -> Result<Capability> {
        let capability = self.dashboard.evolution.toggle(id)?.clone();

        let verb = match capability.state() {
            CapabilityState::Evolving => "resumed",
            _ => "paused",
        };
        let now = self.now();
        self.dashboard.activity.push(
            now,
            ActivityKind::Evolution,
            format!("{} evolution {}", capability.name, verb),
        );
        self.notify();
        Ok(capability)
    }

    /// Mark a discovery as resolved
    pub fn resolve_discovery(&mut self, id: Uuid) -> Result<Discovery> {
        let discovery = self.dashboard.hunter.resolve(id)?.clone();

        let now = self.now();
        self.dashboard.activity.push(
            now,
            ActivityKind::Resolved,
            format!("Resolved: {}", discovery.title),
        );
        self.notify();
        Ok(discovery)
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(
            &self.dashboard,
            self.scheduler.now_ms(),
            self.state == EngineState::Running,
            &self.mounted,
        )
    }

    /// Register a callback run with a fresh snapshot after every change
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Snapshot) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        debug!(%id, "Subscriber added");
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read access to the live state
    pub fn dashboard(&self) -> &DashboardState {
        &self.dashboard
    }

    /// Virtual time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.dashboard.timestamp(self.scheduler.now_ms())
    }

    fn ensure_running(&self) -> Result<()> {
        match self.state {
            EngineState::Running => Ok(()),
            _ => Err(EngineError::NotRunning),
        }
    }

    fn notify(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for (_, callback) in &mut self.subscribers {
            callback(&snapshot);
        }
    }
}
