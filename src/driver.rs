//! Simulation driver (spec §4.5): builds bus + ECUs per configuration,
//! advances ticks until termination, and records trial/step output. Each
//! trial owns its ECUs, bus, and RNG exclusively (spec §5) — `run_batch`
//! exploits that independence to run trials concurrently via `rayon`, the
//! way `prospector-domain-strategy`'s engines and
//! `prospector-core-probabilistic`'s sharded filter parallelize
//! independent units of work with `rayon::prelude::*`.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::attacker::{AttackOutcome, AttackPhase, AttackerEngine};
use crate::bus::{CanBus, TickOutcome};
use crate::config::SimConfig;
use crate::ecu::{Ecu, FaultState, Role};
use crate::error::SimError;
use crate::records::{StepRecord, TrialRecord};
use crate::victim::VictimSchedule;

/// One fully-executed trial: the summary record, plus detailed step
/// records if `config.detailed` was set.
pub struct TrialOutput {
    pub record: TrialRecord,
    pub steps: Vec<StepRecord>,
}

pub struct Driver {
    config: SimConfig,
}

impl Driver {
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Runs a single trial. `trial_index` is 0-based; the emitted record's
    /// `trial` field is 1-indexed per spec §6.
    pub fn run_trial(&self, trial_index: u32) -> Result<TrialOutput, SimError> {
        let mut rng = StdRng::seed_from_u64(self.config.rng_seed.wrapping_add(u64::from(trial_index)));
        let mut bus = CanBus::new(self.config.bus_speed, self.config.frame_bits);
        let step_ms = bus.step_ms();

        let mut ecus: Vec<Ecu> = Vec::new();
        let victim_idx = ecus.len();
        ecus.push(Ecu::new(
            self.config.victim_id,
            Role::Victim(VictimSchedule::new(
                self.config.victim_mode,
                self.config.victim_period_slots,
                self.config.victim_jitter_slots,
            )),
        ));

        let attacker_idx = if self.config.attacker_enabled {
            let total_budget_ticks = (self.config.trial_timeout_ms as f64 / step_ms).ceil() as u64;
            // Analysis gets half the trial's tick budget to lock a period
            // before the trial is declared a period-lock failure.
            let analysis_deadline_tick = total_budget_ticks / 2;
            let idx = ecus.len();
            ecus.push(Ecu::new(
                self.config.attacker_id,
                Role::Attacker(AttackerEngine::new(
                    self.config.victim_id,
                    self.config.analysis_min_matches,
                    analysis_deadline_tick,
                )),
            ));
            Some(idx)
        } else {
            None
        };

        for &id in &self.config.normal_ids {
            ecus.push(Ecu::new(id, Role::Normal));
        }

        let mut time_to_error_passive_ms = None;
        let mut time_to_bus_off_ms = None;
        let mut steps = Vec::new();
        let mut tick: u64 = 0;

        loop {
            let elapsed_ms = tick as f64 * step_ms;
            if elapsed_ms >= self.config.trial_timeout_ms as f64 {
                break;
            }

            let mut intents = Vec::new();
            for (idx, ecu) in ecus.iter_mut().enumerate() {
                if let Some(frame) = ecu.decide_transmission(tick, step_ms, &mut rng) {
                    intents.push((idx, frame));
                }
            }

            let outcome = bus.resolve_tick(&intents, &mut ecus);
            check_invariants(&ecus)?;

            if let Some(attacker_idx) = attacker_idx {
                let victim_clean =
                    matches!(&outcome, TickOutcome::CleanWin { winner, .. } if *winner == victim_idx);
                let victim_tec_after = ecus[victim_idx].tec();
                if let Role::Attacker(engine) = &mut ecus[attacker_idx].role {
                    engine.observe_outcome(tick, victim_clean, victim_tec_after);
                }
            }

            if time_to_error_passive_ms.is_none()
                && ecus[victim_idx].state() == FaultState::ErrorPassive
            {
                time_to_error_passive_ms = Some(elapsed_ms);
            }

            if self.config.detailed {
                steps.push(self.build_step_record(elapsed_ms, &ecus, victim_idx, attacker_idx));
            }

            if ecus[victim_idx].state() == FaultState::BusOff {
                time_to_bus_off_ms = Some(elapsed_ms);
                log::debug!("trial reached bus-off at {elapsed_ms}ms");
                break;
            }

            if let Some(attacker_idx) = attacker_idx {
                if let Role::Attacker(engine) = &ecus[attacker_idx].role {
                    if engine.phase() == AttackPhase::Terminated
                        && engine.outcome() == AttackOutcome::PeriodLockFailure
                    {
                        log::debug!("attacker failed to lock victim period within the analysis window");
                        break;
                    }
                }
            }

            tick += 1;
        }

        let victim_bus_off = u8::from(time_to_bus_off_ms.is_some());
        let attacker_final_tec = attacker_idx.map_or(0, |idx| ecus[idx].tec());

        let record = TrialRecord {
            bus_speed_kbps: self.config.bus_speed.kbps(),
            step_ms,
            time_to_error_passive_ms,
            time_to_bus_off_ms,
            victim_final_tec: ecus[victim_idx].tec(),
            attacker_final_tec,
            victim_bus_off,
            trial: trial_index + 1,
        };

        Ok(TrialOutput { record, steps })
    }

    fn build_step_record(
        &self,
        elapsed_ms: f64,
        ecus: &[Ecu],
        victim_idx: usize,
        attacker_idx: Option<usize>,
    ) -> StepRecord {
        let (attacker_tec, attacker_state, phase) = match attacker_idx {
            Some(idx) => {
                let phase = match &ecus[idx].role {
                    Role::Attacker(engine) => engine.phase(),
                    _ => unreachable!("attacker_idx always points at a Role::Attacker"),
                };
                (ecus[idx].tec(), ecus[idx].state(), phase)
            }
            None => (0, FaultState::ErrorActive, AttackPhase::Terminated),
        };

        StepRecord {
            time_ms: elapsed_ms,
            victim_tec: ecus[victim_idx].tec(),
            attacker_tec,
            victim_state: ecus[victim_idx].state().as_str().to_string(),
            attacker_state: attacker_state.as_str().to_string(),
            phase: phase.as_frame_phase().as_str().to_string(),
        }
    }

    /// Runs `config.trials` independent trials. Each owns its own ECUs,
    /// bus, and RNG stream (seeded from `rng_seed + trial_index`), so they
    /// execute as data-parallel, not merely concurrent, work.
    pub fn run_batch(&self) -> Result<Vec<TrialRecord>, SimError> {
        (0..self.config.trials)
            .into_par_iter()
            .map(|i| self.run_trial(i).map(|output| output.record))
            .collect()
    }
}

/// Defensive re-check of spec §8's invariant 1 after every tick. Should be
/// unreachable given `Ecu`'s saturating arithmetic; guards against future
/// regressions rather than any currently-possible path (spec §7's
/// "internal invariant violation" case).
fn check_invariants(ecus: &[Ecu]) -> Result<(), SimError> {
    for ecu in ecus {
        if ecu.tec() > 256 {
            return Err(SimError::Invariant {
                detail: format!("ecu {} tec {} exceeds cap of 256", ecu.id, ecu.tec()),
            });
        }
        if ecu.state() == FaultState::BusOff && ecu.tec() != 256 {
            return Err(SimError::Invariant {
                detail: format!("ecu {} is bus-off with tec {} (expected 256)", ecu.id, ecu.tec()),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BusSpeed, VictimMode};

    fn config() -> SimConfig {
        SimConfig {
            bus_speed: BusSpeed::Kbps500,
            frame_bits: 111,
            victim_mode: VictimMode::Periodic,
            victim_period_slots: 10,
            victim_jitter_slots: 0,
            victim_id: 100,
            attacker_id: 50,
            normal_ids: Vec::new(),
            attacker_enabled: false,
            analysis_min_matches: 3,
            trial_timeout_ms: 200,
            detailed: false,
            rng_seed: 7,
            trials: 1,
        }
    }

    #[test]
    fn s1_baseline_no_attack_keeps_victim_tec_at_zero() {
        let driver = Driver::new(config()).unwrap();
        let output = driver.run_trial(0).unwrap();
        assert_eq!(output.record.victim_final_tec, 0);
        assert_eq!(output.record.victim_bus_off, 0);
    }

    #[test]
    fn s2_attack_drives_victim_to_bus_off() {
        let mut cfg = config();
        cfg.attacker_enabled = true;
        cfg.detailed = true;
        let driver = Driver::new(cfg).unwrap();
        let output = driver.run_trial(0).unwrap();

        assert_eq!(output.record.victim_bus_off, 1);
        assert_eq!(output.record.victim_final_tec, 256);
        assert!(output.record.attacker_final_tec < 128);

        let phases_seen: std::collections::HashSet<_> =
            output.steps.iter().map(|s| s.phase.clone()).collect();
        assert!(phases_seen.contains("analysis"));
        assert!(phases_seen.contains("attack_phase1"));
        assert!(phases_seen.contains("attack_phase2"));

        let time_to_ep = output.record.time_to_error_passive_ms.expect("reaches EP");
        assert!(time_to_ep > 0.0 && time_to_ep < driver.config().trial_timeout_ms as f64);
    }

    #[test]
    fn s6_tec_floor_never_goes_negative() {
        let driver = Driver::new(config()).unwrap();
        let output = driver.run_trial(0).unwrap();
        assert!(output.record.victim_final_tec <= 256);
    }

    #[test]
    fn s4_non_periodic_victim_still_drives_monotonic_tec() {
        let mut cfg = config();
        cfg.victim_mode = VictimMode::NonPeriodic;
        cfg.victim_jitter_slots = 6;
        cfg.attacker_enabled = true;
        cfg.trial_timeout_ms = 500;
        let driver = Driver::new(cfg).unwrap();
        // Not all seeds lock a period under heavy jitter; this just checks
        // the trial runs to completion without violating invariants.
        let output = driver.run_trial(0).unwrap();
        assert!(output.record.victim_final_tec <= 256);
    }

    #[test]
    fn run_batch_produces_one_record_per_trial() {
        let mut cfg = config();
        cfg.attacker_enabled = true;
        cfg.trials = 16;
        let driver = Driver::new(cfg).unwrap();
        let records = driver.run_batch().unwrap();
        assert_eq!(records.len(), 16);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.trial, i as u32 + 1);
        }
    }
}
