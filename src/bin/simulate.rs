//! CLI entry point over the core simulator. Parses spec §6's configuration
//! table into a `SimConfig` via `clap`'s derive API (grounded in
//! `prospectorengine-prospector-btc`'s `apps/census-taker` /
//! `apps/miner-worker` binaries — the only pack examples that build a CLI
//! surface over a simulation engine with `#[derive(Parser)]`), writes
//! newline-delimited JSON trial/step records to stdout, and leaves file
//! emission, sweeps, and plotting to whatever consumes that stream — those
//! remain explicitly out of scope for the core (spec §1).

use can_busoff_sim::config::{BusSpeed, VictimMode};
use can_busoff_sim::{Driver, SimConfig};
use clap::Parser;

/// Simulate a CAN bus-off denial-of-service attack.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Bus arbitration bit rate in kbps.
    #[arg(long, default_value_t = 500)]
    bus_speed_kbps: u32,

    /// Bits per frame assumed for frame-slot duration derivation.
    #[arg(long, default_value_t = 111)]
    frame_bits: u32,

    /// Victim cadence: periodic, preceded, or non-periodic.
    #[arg(long, value_enum, default_value_t = VictimModeArg::Periodic)]
    victim_mode: VictimModeArg,

    /// Victim period in frame-slots.
    #[arg(long, default_value_t = 10)]
    victim_period_slots: u32,

    /// Maximum jitter in frame-slots (non-periodic mode only).
    #[arg(long, default_value_t = 0)]
    victim_jitter_slots: u32,

    /// Victim's arbitration id.
    #[arg(long, default_value_t = 100)]
    victim_id: u32,

    /// Attacker's arbitration id.
    #[arg(long, default_value_t = 50)]
    attacker_id: u32,

    /// Disable the attacker entirely (spec scenario S1's baseline).
    #[arg(long)]
    no_attacker: bool,

    /// Consecutive matching intervals the attacker needs to lock the
    /// victim's period.
    #[arg(long, default_value_t = 3)]
    analysis_min_matches: u32,

    /// Maximum simulated milliseconds per trial.
    #[arg(long, default_value_t = 1000)]
    trial_timeout_ms: u64,

    /// Emit one step record per tick instead of only the trial summary.
    #[arg(long)]
    detailed: bool,

    /// RNG seed (trial `i` uses `rng_seed + i`).
    #[arg(long, default_value_t = 0)]
    rng_seed: u64,

    /// Number of trials to run.
    #[arg(long, default_value_t = 1)]
    trials: u32,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum VictimModeArg {
    Periodic,
    Preceded,
    NonPeriodic,
}

impl From<VictimModeArg> for VictimMode {
    fn from(arg: VictimModeArg) -> Self {
        match arg {
            VictimModeArg::Periodic => VictimMode::Periodic,
            VictimModeArg::Preceded => VictimMode::Preceded,
            VictimModeArg::NonPeriodic => VictimMode::NonPeriodic,
        }
    }
}

fn main() -> anyhow::Result<()> {
    can_busoff_sim::setup_logging();

    let cli = Cli::parse();
    log::info!("CAN bus-off attack simulator starting ({} trial(s))", cli.trials);

    let config = SimConfig {
        bus_speed: BusSpeed::from_kbps(cli.bus_speed_kbps)?,
        frame_bits: cli.frame_bits,
        victim_mode: cli.victim_mode.into(),
        victim_period_slots: cli.victim_period_slots,
        victim_jitter_slots: cli.victim_jitter_slots,
        victim_id: cli.victim_id,
        attacker_id: cli.attacker_id,
        normal_ids: Vec::new(),
        attacker_enabled: !cli.no_attacker,
        analysis_min_matches: cli.analysis_min_matches,
        trial_timeout_ms: cli.trial_timeout_ms,
        detailed: cli.detailed,
        rng_seed: cli.rng_seed,
        trials: cli.trials,
    };

    let driver = Driver::new(config)?;

    if driver.config().detailed {
        // Detailed mode only makes sense for a single run (spec §6:
        // "used only in a single detailed run").
        let output = driver.run_trial(0)?;
        for step in &output.steps {
            println!("{}", serde_json::to_string(step)?);
        }
        println!("{}", serde_json::to_string(&output.record)?);
    } else {
        let records = driver.run_batch()?;
        for record in &records {
            println!("{}", serde_json::to_string(record)?);
        }
        let summary = can_busoff_sim::RunSummary::from_records(&records);
        log::info!(
            "batch complete: {}/{} trials reached bus-off ({:.1}%)",
            summary.successes,
            summary.trials,
            summary.success_rate * 100.0
        );
        eprintln!("{}", serde_json::to_string(&summary)?);
    }

    Ok(())
}
