//! ECU base: TEC counter, fault-confinement state machine, and the
//! `decide_transmission` capability dispatched by role (spec §4.1, §9's
//! "role as a field" design note).

use serde::{Deserialize, Serialize};

use crate::attacker::AttackerEngine;
use crate::frame::Frame;
use crate::victim::VictimSchedule;

/// TEC threshold above which a node is Error-Passive.
pub const TEC_ERROR_PASSIVE_THRESHOLD: u32 = 128;
/// TEC threshold (and cap) at which a node goes Bus-Off.
pub const TEC_BUS_OFF_THRESHOLD: u32 = 256;

/// Fault-confinement state, gated purely by TEC thresholds (spec §3, §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultState {
    ErrorActive,
    ErrorPassive,
    BusOff,
}

impl FaultState {
    pub fn as_str(self) -> &'static str {
        match self {
            FaultState::ErrorActive => "EA",
            FaultState::ErrorPassive => "EP",
            FaultState::BusOff => "BO",
        }
    }

    fn from_tec(tec: u32) -> Self {
        if tec >= TEC_BUS_OFF_THRESHOLD {
            FaultState::BusOff
        } else if tec >= TEC_ERROR_PASSIVE_THRESHOLD {
            FaultState::ErrorPassive
        } else {
            FaultState::ErrorActive
        }
    }
}

/// ECU behaviour variant. Role-specific scheduling state (victim cadence,
/// attacker learning state) lives inside the variant rather than as flags
/// sprinkled across `Ecu`.
pub enum Role {
    Normal,
    Victim(VictimSchedule),
    Attacker(AttackerEngine),
}

/// A node on the simulated bus.
pub struct Ecu {
    pub id: u32,
    pub role: Role,
    tec: u32,
    state: FaultState,
}

impl Ecu {
    pub fn new(id: u32, role: Role) -> Self {
        Self {
            id,
            role,
            tec: 0,
            state: FaultState::ErrorActive,
        }
    }

    pub fn tec(&self) -> u32 {
        self.tec
    }

    pub fn state(&self) -> FaultState {
        self.state
    }

    /// True iff the ECU may still attempt a transmission this trial
    /// (spec §4.1).
    pub fn can_transmit(&self) -> bool {
        self.state != FaultState::BusOff
    }

    /// Adds `delta` to the TEC (typically +8 on a collision), capping at
    /// 256, then re-evaluates state. No-op once Bus-Off: TEC is frozen
    /// (spec §3).
    pub fn tec_increment(&mut self, delta: u32) {
        if self.state == FaultState::BusOff {
            return;
        }
        self.tec = (self.tec + delta).min(TEC_BUS_OFF_THRESHOLD);
        self.state = FaultState::from_tec(self.tec);
    }

    /// Subtracts 1 from the TEC on a successful transmission, floored at 0.
    /// No-op once Bus-Off.
    pub fn tec_decrement(&mut self) {
        if self.state == FaultState::BusOff {
            return;
        }
        self.tec = self.tec.saturating_sub(1);
        self.state = FaultState::from_tec(self.tec);
    }

    /// Role-dispatched scheduling decision for this tick. Returns `None` if
    /// the ECU does not wish to transmit this tick.
    pub fn decide_transmission(
        &mut self,
        tick: u64,
        step_ms: f64,
        rng: &mut impl rand::Rng,
    ) -> Option<Frame> {
        if !self.can_transmit() {
            return None;
        }
        let my_id = self.id;
        match &mut self.role {
            Role::Normal => None,
            Role::Victim(schedule) => schedule.decide(tick, step_ms, my_id, rng),
            Role::Attacker(engine) => engine.decide(tick, step_ms, my_id),
        }
    }
}
