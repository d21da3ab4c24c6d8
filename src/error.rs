//! Error types for the race simulator.
//!
//! All fallible operations on the public control surface return
//! `SimResult<T>`. A stalled driver is deliberately *not* an error value:
//! the runner recovers from it by falling back to the foreground driver,
//! so it surfaces as a log warning and a stats counter instead.

use thiserror::Error;

/// Unified error type for the simulator core.
#[derive(Debug, Error)]
pub enum SimError {
    /// `start()` was invoked while required configuration is unset.
    /// `missing` names the unset fields for display to the user.
    #[error("configuration incomplete: set {missing} before starting")]
    ConfigurationIncomplete { missing: String },

    /// Non-physical input supplied via `configure` (e.g. zero mass).
    /// Rejected before it can corrupt a run.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// `configure()` was invoked while a run is active.
    #[error("cannot reconfigure while a run is in progress")]
    RunInProgress,

    /// The background driver's thread or channels are gone.
    #[error("driver unavailable: {0}")]
    DriverUnavailable(String),
}

/// Convenience alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;
