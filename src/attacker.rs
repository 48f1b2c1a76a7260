//! Attacker ECU: the two-phase pattern-learning state machine that is the
//! protocol core of the attack (spec §4.4). Modelled as a tagged enum per
//! spec §9's design note, not flags sprinkled across methods.

use serde::{Deserialize, Serialize};

use crate::frame::{Frame, Phase};

/// The attacker's progress through the attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackPhase {
    /// Observing the victim's cadence; transmits nothing.
    Analysis,
    /// Targeting a single predicted collision per victim period; both
    /// ECUs remain Error-Active while the victim's TEC stays below 128.
    Phase1,
    /// Victim is Error-Passive: the attacker contests every tick, winning
    /// cleanly between collisions (spec §4.2's passive-flag asymmetry).
    Phase2,
    /// Trial concluded (victim Bus-Off, timeout, or period-lock failure).
    Terminated,
}

impl AttackPhase {
    pub fn as_frame_phase(self) -> Phase {
        match self {
            AttackPhase::Analysis => Phase::Analysis,
            AttackPhase::Phase1 => Phase::AttackPhase1,
            AttackPhase::Phase2 => Phase::AttackPhase2,
            AttackPhase::Terminated => Phase::Normal,
        }
    }
}

/// Why the attack ended without driving the victim to Bus-Off, if it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    StillRunning,
    PeriodLockFailure,
}

pub struct AttackerEngine {
    phase: AttackPhase,
    victim_id: u32,
    analysis_min_matches: u32,
    analysis_deadline_tick: u64,
    last_victim_tx_tick: Option<u64>,
    candidate_period: Option<u64>,
    consecutive_matches: u32,
    predicted_next_tick: Option<u64>,
    outcome: AttackOutcome,
}

impl AttackerEngine {
    pub fn new(victim_id: u32, analysis_min_matches: u32, analysis_deadline_tick: u64) -> Self {
        Self {
            phase: AttackPhase::Analysis,
            victim_id,
            analysis_min_matches,
            analysis_deadline_tick,
            last_victim_tx_tick: None,
            candidate_period: None,
            consecutive_matches: 0,
            predicted_next_tick: None,
            outcome: AttackOutcome::StillRunning,
        }
    }

    pub fn phase(&self) -> AttackPhase {
        self.phase
    }

    pub fn outcome(&self) -> AttackOutcome {
        self.outcome
    }

    /// Scheduling decision for this tick (spec §4.4). Phase1 fires only on
    /// the predicted collision tick; Phase2 contests every tick, since the
    /// passive error flag means an uncontested retransmission wins cleanly
    /// (handled generically by the bus's arbitration rule, not specially
    /// here) while a victim-aligned tick still collides.
    pub fn decide(&mut self, tick: u64, step_ms: f64, my_id: u32) -> Option<Frame> {
        let fire = match self.phase {
            AttackPhase::Analysis | AttackPhase::Terminated => false,
            AttackPhase::Phase1 => self.predicted_next_tick == Some(tick),
            AttackPhase::Phase2 => true,
        };
        if !fire {
            return None;
        }
        Some(Frame {
            id: self.victim_id,
            origin: my_id,
            timestamp_ms: tick as f64 * step_ms,
            phase: self.phase.as_frame_phase(),
        })
    }

    /// Updates learning/phase state from this tick's resolved outcome.
    /// `victim_transmitted_cleanly` is true iff the victim won arbitration
    /// outright this tick (a successful transmission to observe in
    /// Analysis). `victim_tec_after` drives the Phase1 -> Phase2 handoff.
    pub fn observe_outcome(
        &mut self,
        tick: u64,
        victim_transmitted_cleanly: bool,
        victim_tec_after: u32,
    ) {
        match self.phase {
            AttackPhase::Analysis => {
                self.observe_analysis_tick(tick, victim_transmitted_cleanly);
            }
            AttackPhase::Phase1 => {
                if victim_tec_after >= crate::ecu::TEC_ERROR_PASSIVE_THRESHOLD {
                    self.phase = AttackPhase::Phase2;
                    return;
                }
                self.realign_phase1(tick, victim_transmitted_cleanly);
            }
            AttackPhase::Phase2 => {
                if victim_tec_after >= crate::ecu::TEC_BUS_OFF_THRESHOLD {
                    self.phase = AttackPhase::Terminated;
                }
            }
            AttackPhase::Terminated => {}
        }
    }

    fn observe_analysis_tick(&mut self, tick: u64, victim_transmitted_cleanly: bool) {
        if victim_transmitted_cleanly {
            if let Some(last) = self.last_victim_tx_tick {
                let interval = tick - last;
                if self.candidate_period == Some(interval) {
                    self.consecutive_matches += 1;
                } else {
                    self.candidate_period = Some(interval);
                    self.consecutive_matches = 1;
                }
                if self.consecutive_matches >= self.analysis_min_matches {
                    self.phase = AttackPhase::Phase1;
                    self.predicted_next_tick = Some(tick + interval);
                }
            }
            self.last_victim_tx_tick = Some(tick);
        }
        if self.phase == AttackPhase::Analysis && tick >= self.analysis_deadline_tick {
            self.phase = AttackPhase::Terminated;
            self.outcome = AttackOutcome::PeriodLockFailure;
        }
    }

    /// Re-aligns the predicted collision tick with the learned period,
    /// re-learning on any mispredicted tick (spec §4.4's "timing
    /// tolerance").
    fn realign_phase1(&mut self, tick: u64, victim_transmitted_cleanly: bool) {
        let period = match self.candidate_period {
            Some(p) => p,
            None => return,
        };
        if self.predicted_next_tick == Some(tick) || victim_transmitted_cleanly {
            self.predicted_next_tick = Some(tick + period);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locks_period_after_min_matches() {
        let mut engine = AttackerEngine::new(100, 3, 1000);
        // Four clean victim transmissions ten ticks apart: three
        // consecutive matching intervals.
        for &tick in &[10u64, 20, 30, 40] {
            engine.observe_outcome(tick, true, 0);
        }
        assert_eq!(engine.phase(), AttackPhase::Phase1);
    }

    #[test]
    fn aborts_with_period_lock_failure_after_deadline() {
        let mut engine = AttackerEngine::new(100, 3, 50);
        engine.observe_outcome(50, false, 0);
        assert_eq!(engine.phase(), AttackPhase::Terminated);
        assert_eq!(engine.outcome(), AttackOutcome::PeriodLockFailure);
    }

    #[test]
    fn transitions_to_phase2_when_victim_error_passive() {
        let mut engine = AttackerEngine::new(100, 3, 1000);
        for &tick in &[10u64, 20, 30, 40] {
            engine.observe_outcome(tick, true, 0);
        }
        assert_eq!(engine.phase(), AttackPhase::Phase1);
        engine.observe_outcome(50, false, 128);
        assert_eq!(engine.phase(), AttackPhase::Phase2);
    }

    #[test]
    fn phase2_fires_every_tick() {
        let mut engine = AttackerEngine::new(100, 3, 1000);
        engine.phase = AttackPhase::Phase2;
        for tick in 0..10u64 {
            assert!(engine.decide(tick, 1.0, 50).is_some());
        }
    }
}
