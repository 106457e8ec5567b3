//! Paired trials with and without the audit mechanism.
//!
//! Each trial runs the same seed twice, once with penalties and once
//! without, so the two arms see comparable random streams. Trials are
//! independent and run in parallel.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::report::SummaryReport;
use crate::runner::{run_simulation, SimulationConfig};

/// Mean outcomes of one arm over all trials.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmSummary {
    pub mean_utility: f64,
    pub mean_min_utility: f64,
    pub mean_max_utility: f64,
    pub mean_final_welfare_percent: f64,
    pub mean_compliance: f64,
    pub mean_captures: f64,
}

impl ArmSummary {
    fn from_reports<'a>(reports: impl ExactSizeIterator<Item = &'a SummaryReport>) -> Self {
        let n = reports.len();
        if n == 0 {
            return Self::default();
        }

        let mut summary = reports.fold(Self::default(), |mut acc, r| {
            acc.mean_utility += r.average_utility;
            acc.mean_min_utility += r.min_utility;
            acc.mean_max_utility += r.max_utility;
            acc.mean_final_welfare_percent += r.final_welfare_percent;
            acc.mean_compliance += r.mean_compliance();
            acc.mean_captures += r.total_captures() as f64;
            acc
        });

        let n = n as f64;
        summary.mean_utility /= n;
        summary.mean_min_utility /= n;
        summary.mean_max_utility /= n;
        summary.mean_final_welfare_percent /= n;
        summary.mean_compliance /= n;
        summary.mean_captures /= n;
        summary
    }
}

/// Result of a mechanism comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MechanismComparison {
    pub trials: usize,
    pub seeds: Vec<u64>,
    pub with_mechanism: ArmSummary,
    pub without_mechanism: ArmSummary,
}

/// Run `trials` paired trials of `base`, seeding trial `i` with
/// `base_seed + i`.
///
/// The mechanism flag of `base` is ignored.
pub fn compare_mechanism(
    base: &SimulationConfig,
    trials: usize,
    base_seed: u64,
) -> MechanismComparison {
    let seeds: Vec<u64> = (0..trials as u64)
        .map(|i| base_seed.wrapping_add(i))
        .collect();

    tracing::info!(trials, base_seed, "running mechanism comparison");

    let pairs: Vec<(SummaryReport, SummaryReport)> = seeds
        .par_iter()
        .map(|&seed| {
            let arm = |mechanism_enabled: bool| {
                let config = SimulationConfig {
                    mechanism_enabled,
                    seed: Some(seed),
                    ..base.clone()
                };
                run_simulation(&config, |_| {}, |_, _| {}, None)
            };
            (arm(true), arm(false))
        })
        .collect();

    MechanismComparison {
        trials,
        seeds,
        with_mechanism: ArmSummary::from_reports(pairs.iter().map(|(on, _)| on)),
        without_mechanism: ArmSummary::from_reports(pairs.iter().map(|(_, off)| off)),
    }
}
