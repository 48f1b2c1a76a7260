//! Error types for configuration and simulation failures.
//!
//! Mirrors the teacher's `TestError` split (`crates/testing/src/lib.rs`):
//! hard failures surface as `Err`, soft outcomes (timeout, period-lock
//! failure) are recorded in-band on `TrialRecord` instead.

use thiserror::Error;

/// Raised while validating a [`crate::config::SimConfig`], before any trial
/// is constructed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("bus speed must be one of {{250, 500, 1000}} kbps, got {0}")]
    InvalidBusSpeed(u32),

    #[error("frame_bits must be positive, got {0}")]
    InvalidFrameBits(u32),

    #[error("victim_period_slots must be positive, got {0}")]
    InvalidPeriod(u32),

    #[error("trial_timeout_ms must be positive, got {0}")]
    InvalidTimeout(u64),

    #[error("trials must be at least 1, got {0}")]
    InvalidTrialCount(u32),

    #[error("analysis_min_matches must be at least 1, got {0}")]
    InvalidAnalysisMatches(u32),

    #[error("victim_id ({victim_id}) and attacker_id ({attacker_id}) must differ")]
    ConflictingIds { victim_id: u32, attacker_id: u32 },
}

/// Top-level crate error. `Invariant` is fatal and aborts the offending
/// trial; it should never be observed in a correct implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("internal invariant violated: {detail}")]
    Invariant { detail: String },
}

pub type SimResult<T> = Result<T, SimError>;
