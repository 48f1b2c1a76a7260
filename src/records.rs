//! Per-trial and per-step records (spec §3, §6). These are plain
//! `Serialize`/`Deserialize` data, following the teacher's `TestRecord`
//! (`crates/testing/src/lib.rs`); turning them into newline-delimited JSON
//! is the emission collaborator's job (spec §1's out-of-scope list), not
//! the core's.

use serde::{Deserialize, Serialize};

/// One row of spec §6's trial summary schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub bus_speed_kbps: u32,
    pub step_ms: f64,
    pub time_to_error_passive_ms: Option<f64>,
    pub time_to_bus_off_ms: Option<f64>,
    pub victim_final_tec: u32,
    pub attacker_final_tec: u32,
    pub victim_bus_off: u8,
    pub trial: u32,
}

/// One row of spec §6's detailed step schema, emitted only in `detailed`
/// mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub time_ms: f64,
    pub victim_tec: u32,
    pub attacker_tec: u32,
    pub victim_state: String,
    pub attacker_state: String,
    pub phase: String,
}

/// Aggregate statistics over a batch of trials (SPEC_FULL §3), mirroring
/// the teacher's `StatisticalSummary::from_samples`
/// (`crates/testing/src/lib.rs`) but scoped to the one metric spec.md's S3
/// scenario actually cares about: time-to-bus-off among successes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub trials: u32,
    pub successes: u32,
    pub success_rate: f64,
    pub mean_time_to_bus_off_ms: Option<f64>,
    pub median_time_to_bus_off_ms: Option<f64>,
    pub std_dev_time_to_bus_off_ms: Option<f64>,
}

impl RunSummary {
    pub fn from_records(records: &[TrialRecord]) -> Self {
        let trials = records.len() as u32;
        let mut successful_times: Vec<f64> = records
            .iter()
            .filter(|r| r.victim_bus_off == 1)
            .filter_map(|r| r.time_to_bus_off_ms)
            .collect();
        successful_times.sort_by(|a, b| a.partial_cmp(b).expect("no NaNs in timing data"));

        let successes = successful_times.len() as u32;
        let success_rate = if trials == 0 {
            0.0
        } else {
            f64::from(successes) / f64::from(trials)
        };

        if successful_times.is_empty() {
            return Self {
                trials,
                successes,
                success_rate,
                mean_time_to_bus_off_ms: None,
                median_time_to_bus_off_ms: None,
                std_dev_time_to_bus_off_ms: None,
            };
        }

        let mean = successful_times.iter().sum::<f64>() / successful_times.len() as f64;
        let variance = successful_times
            .iter()
            .map(|t| (t - mean).powi(2))
            .sum::<f64>()
            / successful_times.len() as f64;
        let median = successful_times[successful_times.len() / 2];

        Self {
            trials,
            successes,
            success_rate,
            mean_time_to_bus_off_ms: Some(mean),
            median_time_to_bus_off_ms: Some(median),
            std_dev_time_to_bus_off_ms: Some(variance.sqrt()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(bus_off: u8, time: Option<f64>) -> TrialRecord {
        TrialRecord {
            bus_speed_kbps: 500,
            step_ms: 0.222,
            time_to_error_passive_ms: None,
            time_to_bus_off_ms: time,
            victim_final_tec: if bus_off == 1 { 256 } else { 40 },
            attacker_final_tec: 20,
            victim_bus_off: bus_off,
            trial: 1,
        }
    }

    #[test]
    fn summary_ignores_failed_trials_in_timing_stats() {
        let records = vec![
            record(1, Some(10.0)),
            record(1, Some(20.0)),
            record(0, None),
        ];
        let summary = RunSummary::from_records(&records);
        assert_eq!(summary.trials, 3);
        assert_eq!(summary.successes, 2);
        assert!((summary.success_rate - (2.0 / 3.0)).abs() < 1e-9);
        assert_eq!(summary.mean_time_to_bus_off_ms, Some(15.0));
    }

    #[test]
    fn summary_of_no_trials_has_no_timing_stats() {
        let summary = RunSummary::from_records(&[]);
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.mean_time_to_bus_off_ms, None);
    }
}
