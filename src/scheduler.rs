//! Interval Scheduler
//!
//! A registry of named periodic tasks running on a virtual millisecond clock.
//! `advance` plays the role of the browser event loop: it fires every task
//! that falls due inside the window, one at a time, in due-time order.
//!
//! Guarantees:
//! - a task that returns `Err` loses that firing only, it stays scheduled
//! - a cancelled task never fires again
//! - tasks are tagged with the view that registered them so a whole view can
//!   be torn down in one call
//!
//! Tasks with different periods have no defined relative order beyond their
//! due times. Ties go to the task registered first.

use crate::error::{EngineError, Result};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Periodic callback run against the scheduler's state. The second argument
/// is the virtual time of the firing in milliseconds.
pub type TaskFn<S> = Box<dyn FnMut(&mut S, u64) -> Result<()> + Send>;

/// Box a closure as a task. Lets closure signatures be inferred at call sites.
pub fn task<S, F>(f: F) -> TaskFn<S>
where
    F: FnMut(&mut S, u64) -> Result<()> + Send + 'static,
{
    Box::new(f)
}

/// Opaque reference to a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimerHandle(u64);

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

struct ScheduledTask<S> {
    handle: TimerHandle,
    view: String,
    name: String,
    period_ms: u64,
    next_due_ms: u64,
    fired: u64,
    failed: u64,
    /// Next due time is past the end of the clock
    exhausted: bool,
    task: TaskFn<S>,
}

impl<S> ScheduledTask<S> {
    /// Drop the periods due by `target` that exceed the catch-up limit,
    /// oldest first. Returns how many were dropped.
    fn coalesce(&mut self, target: u64) -> u64 {
        if self.exhausted || self.next_due_ms > target {
            return 0;
        }
        let due = ((target - self.next_due_ms) / self.period_ms).saturating_add(1);
        let skipped = due.saturating_sub(MAX_CATCH_UP);
        if skipped > 0 {
            // skipped <= (target - next_due) / period, so this stays <= target
            self.next_due_ms += skipped * self.period_ms;
            debug!(
                handle = %self.handle,
                view = %self.view,
                task = %self.name,
                skipped,
                "Missed periods coalesced"
            );
        }
        skipped
    }
}

/// Read-only view of a scheduled task
#[derive(Debug, Clone, Serialize)]
pub struct TaskInfo {
    pub handle: TimerHandle,
    pub view: String,
    pub name: String,
    pub period_ms: u64,
    pub next_due_ms: u64,
    pub fired: u64,
    pub failed: u64,
}

/// Most firings a single task gets from one `advance` call
pub const MAX_CATCH_UP: u64 = 1_000;

/// Outcome of one `advance` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    /// Firings that completed successfully
    pub fired: u64,
    /// Firings whose task returned an error
    pub failed: u64,
    /// Missed periods dropped past the catch-up limit
    pub skipped: u64,
}

impl AdvanceReport {
    pub fn total(&self) -> u64 {
        self.fired + self.failed
    }
}

pub struct IntervalScheduler<S> {
    tasks: Vec<ScheduledTask<S>>,
    now_ms: u64,
    next_id: u64,
}

impl<S> IntervalScheduler<S> {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            now_ms: 0,
            next_id: 1,
        }
    }

    /// Register a task that first fires one period from now
    pub fn schedule(
        &mut self,
        view: &str,
        name: &str,
        period_ms: u64,
        task: TaskFn<S>,
    ) -> Result<TimerHandle> {
        if period_ms == 0 {
            return Err(EngineError::InvalidPeriod {
                name: name.to_string(),
            });
        }

        let handle = TimerHandle(self.next_id);
        self.next_id += 1;

        self.tasks.push(ScheduledTask {
            handle,
            view: view.to_string(),
            name: name.to_string(),
            period_ms,
            next_due_ms: self.now_ms.saturating_add(period_ms),
            fired: 0,
            failed: 0,
            exhausted: false,
            task,
        });

        debug!(%handle, view, name, period_ms, "Task scheduled");
        Ok(handle)
    }

    /// Cancel one task. Returns `false` if the handle is unknown.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.handle != handle);
        let removed = self.tasks.len() < before;
        if removed {
            debug!(%handle, "Task cancelled");
        }
        removed
    }

    /// Cancel every task registered by `view`, returning how many were dropped
    pub fn cancel_view(&mut self, view: &str) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.view != view);
        let removed = before - self.tasks.len();
        debug!(view, removed, "View tasks cancelled");
        removed
    }

    pub fn cancel_all(&mut self) -> usize {
        let removed = self.tasks.len();
        self.tasks.clear();
        removed
    }

    /// Move the clock forward by `delta_ms`, firing everything that falls due.
    ///
    /// A window spanning several periods fires the task once per period, up to
    /// [`MAX_CATCH_UP`] firings per task. The oldest periods beyond that are
    /// dropped and counted in [`AdvanceReport::skipped`]. A task whose next due
    /// time would pass `u64::MAX` never fires again.
    pub fn advance(&mut self, delta_ms: u64, state: &mut S) -> AdvanceReport {
        let target = self.now_ms.saturating_add(delta_ms);
        let mut report = AdvanceReport::default();

        for task in &mut self.tasks {
            report.skipped += task.coalesce(target);
        }

        loop {
            let next = self
                .tasks
                .iter()
                .enumerate()
                .filter(|(_, t)| !t.exhausted && t.next_due_ms <= target)
                .min_by_key(|(_, t)| t.next_due_ms)
                .map(|(i, _)| i);

            let Some(idx) = next else {
                break;
            };

            let task = &mut self.tasks[idx];
            self.now_ms = task.next_due_ms;
            match task.next_due_ms.checked_add(task.period_ms) {
                Some(due) => task.next_due_ms = due,
                None => task.exhausted = true,
            }

            match (task.task)(state, self.now_ms) {
                Ok(()) => {
                    task.fired += 1;
                    report.fired += 1;
                }
                Err(e) => {
                    task.failed += 1;
                    report.failed += 1;
                    warn!(
                        handle = %task.handle,
                        view = %task.view,
                        task = %task.name,
                        error = %e,
                        "Task firing failed, schedule kept"
                    );
                }
            }
        }

        self.now_ms = target;
        report
    }

    /// Current virtual time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn is_scheduled(&self, handle: TimerHandle) -> bool {
        self.tasks.iter().any(|t| t.handle == handle)
    }

    pub fn tasks(&self) -> Vec<TaskInfo> {
        self.tasks
            .iter()
            .map(|t| TaskInfo {
                handle: t.handle,
                view: t.view.clone(),
                name: t.name.clone(),
                period_ms: t.period_ms,
                next_due_ms: t.next_due_ms,
                fired: t.fired,
                failed: t.failed,
            })
            .collect()
    }

    pub fn view_task_count(&self, view: &str) -> usize {
        self.tasks.iter().filter(|t| t.view == view).count()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<S> Default for IntervalScheduler<S> {
    fn default() -> Self {
        Self::new()
    }
}
