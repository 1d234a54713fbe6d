//! Control API
//!
//! Thread-safe handle to an engine plus request/response handlers that any
//! host (a UI bridge, a test harness, the real-time driver) can call:
//! - Start/stop/pause the engine and mount views
//! - Invoke the dashboard actions
//! - Read snapshots and statistics

use crate::allocation::{PartialAllocation, ResourceAllocation};
use crate::config::EngineConfig;
use crate::discovery::{Discovery, HuntOutcome};
use crate::engine::{BasiliskEngine, EngineState, EngineStats, TickSummary};
use crate::error::Result;
use crate::evolution::Capability;
use crate::state::Snapshot;
use crate::views::View;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Thread-safe handle to an engine
pub type SharedEngine = Arc<Mutex<BasiliskEngine>>;

/// Create a new shared engine instance
pub fn create_shared_engine(config: EngineConfig) -> Result<SharedEngine> {
    Ok(Arc::new(Mutex::new(BasiliskEngine::new(config)?)))
}

/// Lock the engine. A panic in another holder does not poison the state
/// for everyone else.
pub fn lock(engine: &SharedEngine) -> MutexGuard<'_, BasiliskEngine> {
    engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// API Request/Response Types
// ============================================================================

/// Request to start the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartRequest {
    /// Views to mount right away
    #[serde(default)]
    pub views: Vec<View>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomyRequest {
    pub level: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityRequest {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub id: Uuid,
}

/// Generic API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }
    }
}

impl<T> From<Result<T>> for ApiResponse<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(e) => Self::error(&e.to_string()),
        }
    }
}

/// Engine status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub state: EngineState,
    pub time_ms: u64,
    pub mounted_views: Vec<View>,
    pub stats: EngineStats,
}

impl EngineStatus {
    pub fn from_engine(engine: &BasiliskEngine) -> Self {
        Self {
            state: engine.state(),
            time_ms: engine.now_ms(),
            mounted_views: engine.mounted_views().to_vec(),
            stats: engine.stats().clone(),
        }
    }
}

// ============================================================================
// API Handler Functions
// ============================================================================

/// Start the engine and mount the requested views
pub fn handle_start(engine: &SharedEngine, request: StartRequest) -> ApiResponse<EngineStatus> {
    let mut engine = lock(engine);
    engine.start();
    for view in request.views {
        if let Err(e) = engine.mount_view(view) {
            return ApiResponse::error(&e.to_string());
        }
    }
    ApiResponse::success(EngineStatus::from_engine(&engine))
}

pub fn handle_stop(engine: &SharedEngine) -> ApiResponse<EngineStatus> {
    let mut engine = lock(engine);
    engine.stop();
    ApiResponse::success(EngineStatus::from_engine(&engine))
}

pub fn handle_pause(engine: &SharedEngine) -> ApiResponse<EngineStatus> {
    let mut engine = lock(engine);
    engine.pause();
    ApiResponse::success(EngineStatus::from_engine(&engine))
}

pub fn handle_resume(engine: &SharedEngine) -> ApiResponse<EngineStatus> {
    let mut engine = lock(engine);
    engine.resume();
    ApiResponse::success(EngineStatus::from_engine(&engine))
}

pub fn handle_get_status(engine: &SharedEngine) -> ApiResponse<EngineStatus> {
    ApiResponse::success(EngineStatus::from_engine(&lock(engine)))
}

/// Full state snapshot (getState)
pub fn handle_get_state(engine: &SharedEngine) -> ApiResponse<Snapshot> {
    ApiResponse::success(lock(engine).snapshot())
}

pub fn handle_mount(engine: &SharedEngine, view: View) -> ApiResponse<usize> {
    lock(engine).mount_view(view).into()
}

pub fn handle_unmount(engine: &SharedEngine, view: View) -> ApiResponse<usize> {
    ApiResponse::success(lock(engine).unmount_view(view))
}

/// Advance the virtual clock manually
pub fn handle_tick(engine: &SharedEngine, delta_ms: u64) -> ApiResponse<TickSummary> {
    ApiResponse::success(lock(engine).advance(delta_ms))
}

pub fn handle_start_hunt(engine: &SharedEngine) -> ApiResponse<HuntOutcome> {
    lock(engine).start_hunt().into()
}

pub fn handle_toggle_scan(engine: &SharedEngine) -> ApiResponse<bool> {
    lock(engine).toggle_scan().into()
}

pub fn handle_set_allocation(
    engine: &SharedEngine,
    request: PartialAllocation,
) -> ApiResponse<ResourceAllocation> {
    lock(engine).set_resource_allocation(request).into()
}

pub fn handle_set_autonomy(engine: &SharedEngine, request: AutonomyRequest) -> ApiResponse<u8> {
    ApiResponse::success(lock(engine).set_autonomy_level(request.level))
}

pub fn handle_toggle_evolution(
    engine: &SharedEngine,
    request: CapabilityRequest,
) -> ApiResponse<Capability> {
    lock(engine).toggle_capability_evolution(&request.id).into()
}

pub fn handle_resolve(engine: &SharedEngine, request: ResolveRequest) -> ApiResponse<Discovery> {
    lock(engine).resolve_discovery(request.id).into()
}

/// Action routes, for hosts that dispatch by name
pub fn get_api_routes() -> Vec<(&'static str, &'static str)> {
    vec![
        ("start", "Start the engine and mount views"),
        ("stop", "Stop the engine and unmount every view"),
        ("pause", "Pause the virtual clock"),
        ("resume", "Resume a paused engine"),
        ("status", "Engine state and statistics"),
        ("state", "Full dashboard snapshot"),
        ("mount", "Mount a view"),
        ("unmount", "Unmount a view"),
        ("tick", "Advance the virtual clock (debug)"),
        ("hunt", "Start a hunt"),
        ("scan", "Start or abort a scanner sweep"),
        ("allocate", "Rebalance resource allocation"),
        ("autonomy", "Set the autonomy level"),
        ("evolution", "Toggle evolution of a capability"),
        ("resolve", "Resolve a discovery"),
    ]
}

/// Print the action table to stdout
pub fn print_api_docs() {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Basilisk Engine Control API                  ║");
    println!("╠══════════════════════════════════════════════════════════════╣");

    for (name, desc) in get_api_routes() {
        println!("║ {:10} - {:47} ║", name, desc);
    }

    println!("╚══════════════════════════════════════════════════════════════╝");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> SharedEngine {
        create_shared_engine(EngineConfig {
            seed: Some(3),
            ..EngineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_routes_are_unique_and_described() {
        let routes = get_api_routes();
        assert_eq!(routes.len(), 15);
        let mut names: Vec<&str> = routes.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), routes.len());
        assert!(routes.iter().all(|(_, desc)| !desc.is_empty() && desc.len() <= 47));
        assert!(names.contains(&"hunt") && names.contains(&"scan"));
    }

    #[test]
    fn test_start_stop_cycle() {
        let engine = shared();

        let start = handle_start(
            &engine,
            StartRequest {
                views: vec![View::Dashboard, View::Brain],
            },
        );
        assert!(start.success);
        let status = start.data.unwrap();
        assert_eq!(status.state, EngineState::Running);
        assert_eq!(status.mounted_views.len(), 2);

        let stop = handle_stop(&engine);
        assert!(stop.success);
        assert_eq!(stop.data.unwrap().state, EngineState::Stopped);
    }

    #[test]
    fn test_actions_before_start_fail() {
        let engine = shared();
        let response = handle_start_hunt(&engine);
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Engine is not running"));
    }

    #[test]
    fn test_tick_and_state() {
        let engine = shared();
        handle_start(
            &engine,
            StartRequest {
                views: vec![View::Loading],
            },
        );

        let tick = handle_tick(&engine, 1_200).data.unwrap();
        assert_eq!(tick.fired, 10);
        assert_eq!(tick.time_ms, 1_200);

        let state = handle_get_state(&engine).data.unwrap();
        assert!(state.loading.progress > 0.0);
        assert_eq!(state.time_ms, 1_200);
    }

    #[test]
    fn test_allocation_and_errors() {
        let engine = shared();
        let ok = handle_set_allocation(
            &engine,
            PartialAllocation {
                hunting: Some(50.0),
                ..Default::default()
            },
        );
        assert!(ok.success);
        assert_eq!(ok.data.unwrap().sum(), 100);

        let unknown = handle_toggle_evolution(
            &engine,
            CapabilityRequest {
                id: "does-not-exist".to_string(),
            },
        );
        assert!(!unknown.success);

        let missing = handle_resolve(&engine, ResolveRequest { id: Uuid::nil() });
        assert!(!missing.success);
    }

    #[test]
    fn test_response_serialization() {
        let response = handle_set_autonomy(&shared(), AutonomyRequest { level: 11 });
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"success":true,"data":10}"#);
    }
}
