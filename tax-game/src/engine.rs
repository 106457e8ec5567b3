//! Round engine: one round of decisions, audits and welfare feedback.
//!
//! Each round:
//!
//! 1. The welfare pool left by the previous round is split evenly into a
//!    per-head bonus.
//! 2. Every individual, in population order, picks an evasion level, is
//!    audited, and is either penalized or paid.
//! 3. The pool for the next round is the base pool scaled by the fraction of
//!    nominal tax actually collected.
//!
//! Individuals never see each other's state within a round; the only shared
//! inputs are the previous round's pool and mean evasion level.

use std::num::NonZeroUsize;

use rand::{Rng, RngCore};

use crate::agent::{Individual, Population};
use crate::config::{DebtPolicy, GameConfig, PayoffScheme};
use crate::payoff::{DecisionContext, PayoffModel};
use crate::policy::{policy_for, DecisionPolicy};
use crate::report::{RoundEvent, RoundSummary};

/// Result of settling one individual's audit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settlement {
    /// Amount added to the individual's utility.
    pub payoff: f64,
    /// Whether a penalty was applied.
    pub penalized: bool,
}

/// Owns the welfare pool and applies rounds to a population.
#[derive(Debug)]
pub struct RoundEngine {
    config: GameConfig,
    policy: Box<dyn DecisionPolicy>,
    mechanism_enabled: bool,
    population_size: usize,
    /// Pool at full compliance.
    welfare_base: f64,
    /// Pool available to the next round.
    welfare: f64,
    /// Mean evasion of the last completed round.
    previous_mean_evasion: f64,
}

impl RoundEngine {
    /// Create an engine with the policy named in `config`.
    pub fn new(config: GameConfig, population_size: NonZeroUsize, mechanism_enabled: bool) -> Self {
        let policy = policy_for(&config);
        Self::with_policy(config, policy, population_size, mechanism_enabled)
    }

    /// Create an engine with an explicit policy.
    pub fn with_policy(
        config: GameConfig,
        policy: Box<dyn DecisionPolicy>,
        population_size: NonZeroUsize,
        mechanism_enabled: bool,
    ) -> Self {
        let population_size = population_size.get();
        let welfare_base = config.scaled_welfare_base(population_size);
        let previous_mean_evasion = config.initial_evasion;
        Self {
            config,
            policy,
            mechanism_enabled,
            population_size,
            welfare_base,
            welfare: welfare_base,
            previous_mean_evasion,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn policy(&self) -> &dyn DecisionPolicy {
        self.policy.as_ref()
    }

    pub fn mechanism_enabled(&self) -> bool {
        self.mechanism_enabled
    }

    /// Current welfare pool.
    pub fn welfare(&self) -> f64 {
        self.welfare
    }

    /// Pool at full compliance.
    pub fn welfare_base(&self) -> f64 {
        self.welfare_base
    }

    /// Current pool as a percent of its base.
    pub fn welfare_percent(&self) -> f64 {
        if self.welfare_base > 0.0 {
            self.welfare / self.welfare_base * 100.0
        } else {
            0.0
        }
    }

    /// Each individual's share of the current pool.
    pub fn welfare_bonus_per_head(&self) -> f64 {
        self.welfare / self.population_size as f64
    }

    /// Payoff model for the upcoming round.
    pub fn payoff_model(&self) -> PayoffModel<'_> {
        PayoffModel::new(&self.config, self.previous_mean_evasion)
    }

    /// Play one round over `population`, reporting each individual's outcome
    /// to `on_event`.
    pub fn run_round(
        &mut self,
        round: u64,
        population: &mut Population,
        rng: &mut dyn RngCore,
        on_event: &mut dyn FnMut(&RoundEvent),
    ) -> RoundSummary {
        debug_assert_eq!(population.len(), self.population_size);

        let model = self.payoff_model();
        let welfare_bonus = self.welfare_bonus_per_head();
        let welfare_percent = self.welfare_percent();

        let mut total_paid = 0.0;
        let mut total_evasion = 0.0;
        let mut captures = 0u64;

        for agent in population.iter_mut() {
            let ctx = DecisionContext {
                welfare_bonus,
                penalty_debt: agent.penalty_debt,
                mechanism_enabled: self.mechanism_enabled,
            };
            self.policy.decide(agent, &ctx, &model, rng);
            let level = agent.evasion;

            let detection = self.detection_chance(&model, agent);
            let roll: f64 = rng.gen();
            let caught = roll < detection;

            let settlement = self.settle(agent, &model, welfare_bonus, caught);
            self.policy.after_audit(agent, settlement.penalized);
            if settlement.penalized {
                captures += 1;
            }

            total_paid += model.tax_paid(level);
            total_evasion += level;

            on_event(&RoundEvent {
                round,
                agent_id: agent.id(),
                evasion_level: level,
                caught,
                payoff: settlement.payoff,
                strategy_probabilities: agent.strategy_probabilities,
                welfare_percent,
            });
        }

        let nominal = self.config.flat_tax * self.population_size as f64;
        // Clamped against rounding in the sum.
        let compliance_rate = (total_paid / nominal).clamp(0.0, 1.0);
        let mean_evasion = total_evasion / self.population_size as f64;

        self.welfare = self.welfare_base * compliance_rate;
        self.previous_mean_evasion = mean_evasion;

        tracing::debug!(
            round,
            welfare_percent,
            next_welfare_percent = self.welfare_percent(),
            compliance_rate,
            captures,
            mean_evasion,
            "round complete"
        );

        RoundSummary {
            round,
            welfare_percent,
            compliance_rate,
            captures,
            mean_evasion,
            total_paid,
        }
    }

    /// Audit chance for `agent` at its current level, including any policy
    /// multiplier, clamped to [0, 1].
    pub fn detection_chance(&self, model: &PayoffModel<'_>, agent: &Individual) -> f64 {
        (model.detection_probability(agent.evasion) * self.policy.detection_multiplier(agent))
            .clamp(0.0, 1.0)
    }

    /// Apply the audit outcome to `agent` at its current evasion level.
    pub fn settle(
        &self,
        agent: &mut Individual,
        model: &PayoffModel<'_>,
        welfare_bonus: f64,
        caught: bool,
    ) -> Settlement {
        let level = agent.evasion;

        if caught && self.mechanism_enabled {
            let penalty = model.penalty(level);
            let payoff = if self.config.charge_standing_debt {
                penalty + agent.penalty_debt
            } else {
                penalty
            };

            agent.times_caught += 1;
            agent.penalty_debt = match self.config.debt_policy {
                DebtPolicy::Replace => penalty,
                DebtPolicy::Accumulate => agent.penalty_debt + penalty,
            };
            agent.utility += payoff;

            return Settlement {
                payoff,
                penalized: true,
            };
        }

        if caught && !self.config.accrue_when_unenforced {
            return Settlement {
                payoff: 0.0,
                penalized: false,
            };
        }

        let payoff = match self.config.payoff_scheme {
            PayoffScheme::Welfare => welfare_bonus - model.tax_paid(level),
            PayoffScheme::Evasion => level * self.config.utility_per_percent,
        };
        agent.utility += payoff;

        Settlement {
            payoff,
            penalized: false,
        }
    }
}
