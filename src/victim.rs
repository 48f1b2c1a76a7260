//! Victim ECU scheduling (spec §4.3): periodic, preceded, or non-periodic
//! cadence. Cadence state is owned by the `Role::Victim` variant, not by
//! `Ecu` itself (spec §9's role-as-a-field note).

use rand::Rng;

use crate::config::VictimMode;
use crate::frame::{Frame, Phase};

/// Every `AUX_INTERLEAVE_CYCLES`th periodic cycle, `Preceded` mode sends a
/// lower-priority auxiliary frame instead of the victim's own id. The
/// numeric offset used for that frame's id is `aux_id_offset` above the
/// victim's id (lower priority = higher numeric id, spec §4.2).
const AUX_INTERLEAVE_CYCLES: u64 = 4;
const AUX_ID_OFFSET: u32 = 1000;

pub struct VictimSchedule {
    mode: VictimMode,
    period: u64,
    jitter: u64,
    next_tick: u64,
    cycle_count: u64,
}

impl VictimSchedule {
    pub fn new(mode: VictimMode, period_slots: u32, jitter_slots: u32) -> Self {
        Self {
            mode,
            period: u64::from(period_slots.max(1)),
            jitter: u64::from(jitter_slots),
            next_tick: u64::from(period_slots.max(1)),
            cycle_count: 0,
        }
    }

    pub fn decide(
        &mut self,
        tick: u64,
        step_ms: f64,
        my_id: u32,
        rng: &mut impl Rng,
    ) -> Option<Frame> {
        if tick < self.next_tick {
            return None;
        }

        let send_aux = matches!(self.mode, VictimMode::Preceded)
            && self.cycle_count % AUX_INTERLEAVE_CYCLES == AUX_INTERLEAVE_CYCLES - 1;
        let id = if send_aux {
            my_id.saturating_add(AUX_ID_OFFSET)
        } else {
            my_id
        };

        self.cycle_count += 1;
        self.next_tick = tick + self.next_period(rng);

        Some(Frame {
            id,
            origin: my_id,
            timestamp_ms: tick as f64 * step_ms,
            phase: Phase::Normal,
        })
    }

    fn next_period(&self, rng: &mut impl Rng) -> u64 {
        match self.mode {
            VictimMode::Periodic | VictimMode::Preceded => self.period,
            VictimMode::NonPeriodic => {
                if self.jitter == 0 {
                    self.period
                } else {
                    let offset = rng.gen_range(0..=2 * self.jitter) as i64 - self.jitter as i64;
                    (self.period as i64 + offset).max(1) as u64
                }
            }
        }
    }
}
