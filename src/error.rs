//! Error types for the simulation engine.
//!
//! Nothing here is fatal. Actions surface these to the host, periodic tasks
//! report them to the scheduler which logs and keeps going.

use thiserror::Error;
use uuid::Uuid;

/// Engine error types.
#[derive(Error, Debug)]
pub enum EngineError {
    /// An action needs more of a resource than is available
    #[error("Insufficient resource: required {required}, available {available}")]
    InsufficientResource { required: f64, available: f64 },

    /// A resource split that cannot be normalized (e.g. all zero)
    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),

    /// Periodic task registered with a zero period
    #[error("Invalid period for task '{name}'")]
    InvalidPeriod { name: String },

    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    /// Capability already reached its max level and cannot evolve again
    #[error("Capability is capped: {0}")]
    CapabilityCapped(String),

    #[error("Unknown discovery: {0}")]
    UnknownDiscovery(Uuid),

    /// Action requires a running engine
    #[error("Engine is not running")]
    NotRunning,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EngineError::InsufficientResource {
            required: 20.0,
            available: 5.0,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient resource: required 20, available 5"
        );

        let err = EngineError::InvalidPeriod {
            name: "metrics.threat".to_string(),
        };
        assert!(err.to_string().contains("metrics.threat"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: EngineError = parse.unwrap_err().into();
        assert!(matches!(err, EngineError::Json(_)));
    }
}
