//! Frame: the ephemeral unit of transmission intent resolved by the bus each
//! tick (spec §3). Never retained beyond one tick.

use serde::{Deserialize, Serialize};

/// Which leg of the attack (if any) produced this frame. Carried on the
/// frame so the bus and step records can tag outcomes without re-deriving
/// phase from ECU state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Analysis,
    AttackPhase1,
    AttackPhase2,
    Normal,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Analysis => "analysis",
            Phase::AttackPhase1 => "attack_phase1",
            Phase::AttackPhase2 => "attack_phase2",
            Phase::Normal => "normal",
        }
    }
}

/// One CAN frame slot's worth of transmission intent. `id` is the
/// arbitration identifier (lower wins); `origin` is the transmitting ECU's
/// id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub id: u32,
    pub origin: u32,
    pub timestamp_ms: f64,
    pub phase: Phase,
}
