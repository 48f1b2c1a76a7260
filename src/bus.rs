//! CAN Bus: per-tick arbitration, collision resolution, and TEC mutation
//! (spec §4.2). The bus is the sole authority on TEC mutation (spec §9);
//! ECUs never modify their own TEC in response to a collision they detect.

use crate::config::BusSpeed;
use crate::ecu::Ecu;
use crate::frame::Frame;

/// Amount added to TEC on each side of a same-ID collision (spec §4.2, §4.4).
pub const COLLISION_TEC_PENALTY: u32 = 8;

/// The result of resolving one tick's declared intents, reported back to
/// the driver (for phase transitions / detailed records) without it having
/// to re-derive what happened from raw TEC deltas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    /// A single ECU held the lowest arbitration id and transmitted
    /// successfully.
    CleanWin { winner: usize, id: u32 },
    /// Two or more ECUs shared the lowest arbitration id.
    Collision { participants: Vec<usize>, id: u32 },
}

pub struct CanBus {
    bus_speed: BusSpeed,
    frame_bits: u32,
    time_ms: f64,
}

impl CanBus {
    pub fn new(bus_speed: BusSpeed, frame_bits: u32) -> Self {
        Self {
            bus_speed,
            frame_bits,
            time_ms: 0.0,
        }
    }

    /// Frame-slot duration in milliseconds (spec §4.2).
    pub fn step_ms(&self) -> f64 {
        f64::from(self.frame_bits) / f64::from(self.bus_speed.kbps())
    }

    pub fn time_ms(&self) -> f64 {
        self.time_ms
    }

    /// Resolves one tick's declared transmission intents against `ecus`,
    /// mutating TEC/state in place, then advances the simulated clock by
    /// one frame slot.
    ///
    /// `intents` pairs an index into `ecus` with the frame that ECU
    /// declared. Arbitration: the lowest `id` wins. A tie at the lowest id
    /// is a collision — this is how the attacker's same-ID frame forces a
    /// bit-level collision with the victim (spec §4.2 step 3), and it is
    /// also how two mis-configured normal ECUs sharing an id would behave
    /// (spec §4.2's edge-case policy: handled consistently either way).
    pub fn resolve_tick(&mut self, intents: &[(usize, Frame)], ecus: &mut [Ecu]) -> TickOutcome {
        let outcome = if intents.is_empty() {
            TickOutcome::Idle
        } else {
            let min_id = intents.iter().map(|(_, frame)| frame.id).min().expect("non-empty");
            let mut winners: Vec<usize> = intents
                .iter()
                .filter(|(_, frame)| frame.id == min_id)
                .map(|(idx, _)| *idx)
                .collect();
            winners.sort_unstable();

            if winners.len() == 1 {
                let winner = winners[0];
                ecus[winner].tec_decrement();
                TickOutcome::CleanWin { winner, id: min_id }
            } else {
                for &idx in &winners {
                    ecus[idx].tec_increment(COLLISION_TEC_PENALTY);
                }
                TickOutcome::Collision { participants: winners, id: min_id }
            }
        };

        self.time_ms += self.step_ms();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecu::Role;
    use crate::frame::Phase;

    fn frame(id: u32, origin: u32) -> Frame {
        Frame { id, origin, timestamp_ms: 0.0, phase: Phase::Normal }
    }

    #[test]
    fn clean_win_decrements_winner_only() {
        let mut bus = CanBus::new(BusSpeed::Kbps500, 111);
        let mut ecus = vec![Ecu::new(1, Role::Normal), Ecu::new(2, Role::Normal)];
        ecus[0].tec_increment(10);
        ecus[1].tec_increment(10);
        let intents = vec![(0, frame(5, 1)), (1, frame(9, 2))];
        let outcome = bus.resolve_tick(&intents, &mut ecus);
        assert_eq!(outcome, TickOutcome::CleanWin { winner: 0, id: 5 });
        assert_eq!(ecus[0].tec(), 9);
        assert_eq!(ecus[1].tec(), 10);
    }

    #[test]
    fn same_id_collision_penalizes_both() {
        let mut bus = CanBus::new(BusSpeed::Kbps500, 111);
        let mut ecus = vec![Ecu::new(1, Role::Normal), Ecu::new(2, Role::Normal)];
        let intents = vec![(0, frame(42, 1)), (1, frame(42, 2))];
        let outcome = bus.resolve_tick(&intents, &mut ecus);
        assert_eq!(
            outcome,
            TickOutcome::Collision { participants: vec![0, 1], id: 42 }
        );
        assert_eq!(ecus[0].tec(), 8);
        assert_eq!(ecus[1].tec(), 8);
    }

    #[test]
    fn idle_tick_mutates_nothing_but_advances_time() {
        let mut bus = CanBus::new(BusSpeed::Kbps500, 111);
        let mut ecus: Vec<Ecu> = Vec::new();
        let before = bus.time_ms();
        let outcome = bus.resolve_tick(&[], &mut ecus);
        assert_eq!(outcome, TickOutcome::Idle);
        assert!(bus.time_ms() > before);
    }

    #[test]
    fn decrement_never_underflows() {
        let mut bus = CanBus::new(BusSpeed::Kbps500, 111);
        let mut ecus = vec![Ecu::new(1, Role::Normal)];
        for _ in 0..5 {
            bus.resolve_tick(&[(0, frame(1, 1))], &mut ecus);
        }
        assert_eq!(ecus[0].tec(), 0);
    }
}
