//! Records emitted during a run and the final summary.

use serde::{Deserialize, Serialize};

use crate::agent::{AgentId, Population};

/// What happened to one individual in one round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundEvent {
    pub round: u64,
    pub agent_id: AgentId,
    /// Percent of tax evaded.
    pub evasion_level: f64,
    /// Whether the audit detected the evasion.
    pub caught: bool,
    /// Payoff credited this round; the penalty when one was applied.
    pub payoff: f64,
    /// Weights over {0, 50, 100}; absent for the continuous policy.
    pub strategy_probabilities: Option<[f64; 3]>,
    /// Welfare pool the round started with, as a percent of its base.
    pub welfare_percent: f64,
}

/// Aggregate figures for one round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round: u64,
    /// Welfare pool at the start of the round, percent of base.
    pub welfare_percent: f64,
    /// Tax paid over tax owed.
    pub compliance_rate: f64,
    /// Penalties applied this round.
    pub captures: u64,
    pub mean_evasion: f64,
    pub total_paid: f64,
}

/// Final figures for one individual.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: AgentId,
    pub total_utility: f64,
    pub times_caught: u32,
}

/// Outcome of a whole run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub per_agent: Vec<AgentSummary>,
    pub average_utility: f64,
    pub max_utility: f64,
    pub min_utility: f64,
    /// Welfare pool after the last completed round, percent of base.
    pub final_welfare_percent: f64,
    pub rounds_completed: u64,
    /// True when the run stopped on a cancellation request.
    pub cancelled: bool,
    /// Seed of the random source that drove the run.
    pub seed: u64,
    pub rounds: Vec<RoundSummary>,
}

impl SummaryReport {
    /// Summarize the population's state.
    pub fn from_population(
        population: &Population,
        final_welfare_percent: f64,
        rounds: Vec<RoundSummary>,
        seed: u64,
        cancelled: bool,
    ) -> Self {
        let per_agent: Vec<AgentSummary> = population
            .iter()
            .map(|a| AgentSummary {
                id: a.id(),
                total_utility: a.utility,
                times_caught: a.times_caught,
            })
            .collect();

        let utilities = per_agent.iter().map(|a| a.total_utility);
        let average_utility = utilities.clone().sum::<f64>() / per_agent.len().max(1) as f64;
        let max_utility = utilities.clone().fold(f64::NEG_INFINITY, f64::max);
        let min_utility = utilities.fold(f64::INFINITY, f64::min);

        Self {
            per_agent,
            average_utility,
            max_utility,
            min_utility,
            final_welfare_percent,
            rounds_completed: rounds.len() as u64,
            cancelled,
            seed,
            rounds,
        }
    }

    /// Total penalties applied across the population.
    pub fn total_captures(&self) -> u64 {
        self.per_agent.iter().map(|a| a.times_caught as u64).sum()
    }

    /// Mean compliance rate over the completed rounds.
    pub fn mean_compliance(&self) -> f64 {
        if self.rounds.is_empty() {
            return 0.0;
        }
        self.rounds.iter().map(|r| r.compliance_rate).sum::<f64>() / self.rounds.len() as f64
    }
}
