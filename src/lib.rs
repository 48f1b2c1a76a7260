//! Core CAN bus-off attack simulator: arbitration/collision engine,
//! per-ECU fault-confinement state machine, victim transmitter, and
//! attacker pattern-learning scheduler.
//!
//! Log emission to newline-delimited files, batch parameter sweeps, and
//! visualisation are external collaborators layered on top of this crate
//! (see `src/bin/simulate.rs` for a thin example); this crate owns only
//! the protocol-faithful simulation and the `log`/`serde` facades the
//! teacher codebase builds every component on.

pub mod attacker;
pub mod bus;
pub mod config;
pub mod driver;
pub mod ecu;
pub mod error;
pub mod frame;
pub mod records;
pub mod victim;

pub use config::{BusSpeed, SimConfig, VictimMode};
pub use driver::{Driver, TrialOutput};
pub use error::{ConfigError, SimError};
pub use records::{RunSummary, StepRecord, TrialRecord};

/// Initializes the `env_logger` backend for the `log` facade, exactly as
/// the teacher's `crates/testing/src/lib.rs::setup_logging` does. The core
/// simulation only ever logs through `log::{info,debug,warn}!`; only
/// binaries decide how (or whether) to render it.
pub fn setup_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
