//! # basilisk-sim - Simulated Dashboard Engine
//!
//! State-evolution engine behind the Basilisk dashboard. Every number on the
//! dashboard is produced here from a seedable random source and fixture
//! vocabularies; nothing is scanned, sent or stored.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          basilisk-sim                            │
//! │                                                                  │
//! │   ┌──────────────────────────────────────────────────────────┐   │
//! │   │                    BasiliskEngine                        │   │
//! │   │                                                          │   │
//! │   │  ┌────────────┐  ┌───────────────────┐  ┌─────────────┐  │   │
//! │   │  │   Views    │──│ IntervalScheduler │──│ Subscribers │  │   │
//! │   │  └────────────┘  └─────────┬─────────┘  └─────────────┘  │   │
//! │   │                            ▼                             │   │
//! │   │                   ┌─────────────────┐                    │   │
//! │   │                   │ DashboardState  │                    │   │
//! │   │                   └─────────────────┘                    │   │
//! │   └──────────────────────────────────────────────────────────┘   │
//! │                                                                  │
//! │   Components:                                                    │
//! │   ├── walk        (bounded random walk)                          │
//! │   ├── progress    (staged loading / scan bars)                   │
//! │   ├── discovery   (energy-gated hunts, mock findings)            │
//! │   ├── allocation  (three buckets summing to 100)                 │
//! │   └── evolution   (levelled capabilities)                        │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Design Principles
//!
//! 1. **Explicit state** - all mutable state lives in one `DashboardState`
//!    owned by the engine. No globals.
//!
//! 2. **Virtual time** - the scheduler runs on a millisecond clock advanced
//!    by the caller, so a 10 minute session can be replayed instantly.
//!
//! 3. **Injected randomness** - a seeded engine is fully reproducible,
//!    discovery ids included.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use basilisk_sim::{BasiliskEngine, EngineConfig, View};
//!
//! let mut engine = BasiliskEngine::new(EngineConfig::default())?;
//! engine.start();
//! engine.mount_view(View::Dashboard)?;
//! engine.advance(5_000);
//! let snapshot = engine.snapshot();
//! # Ok::<(), basilisk_sim::EngineError>(())
//! ```

pub mod allocation;
pub mod api;
pub mod config;
pub mod core;
pub mod discovery;
pub mod driver;
pub mod engine;
pub mod error;
pub mod evolution;
pub mod metrics;
pub mod progress;
pub mod scheduler;
pub mod state;
pub mod views;
pub mod walk;

pub use allocation::{PartialAllocation, ResourceAllocation};
pub use config::EngineConfig;
pub use discovery::{Discovery, HuntOutcome};
pub use engine::{BasiliskEngine, EngineState, EngineStats, TickSummary};
pub use error::{EngineError, Result};
pub use state::{EngineEvent, Snapshot};
pub use views::View;
