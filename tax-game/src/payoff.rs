//! Payoff model: audit chances, penalties and expected utilities.
//!
//! Everything here is a pure function of the [`GameConfig`] and the inputs.
//! The only round-dependent value is the detection ceiling of the
//! endogenous model, which is fixed when the model is built for a round.

use serde::{Deserialize, Serialize};

use crate::config::{DetectionModel, GameConfig, PenaltyShape};

/// Evasion level of full compliance, in percent.
pub const NO_EVASION: f64 = 0.0;

/// Evasion level of half evasion, in percent.
pub const HALF_EVASION: f64 = 50.0;

/// Evasion level of full evasion, in percent.
pub const FULL_EVASION: f64 = 100.0;

/// The three discrete strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Pay everything.
    Comply,
    /// Evade half.
    HalfCheat,
    /// Evade everything.
    FullCheat,
}

impl Strategy {
    /// All strategies in tie-break order.
    pub const ALL: [Strategy; 3] = [Strategy::Comply, Strategy::HalfCheat, Strategy::FullCheat];

    /// Evaded share in percent.
    pub fn percent(self) -> f64 {
        match self {
            Strategy::Comply => NO_EVASION,
            Strategy::HalfCheat => HALF_EVASION,
            Strategy::FullCheat => FULL_EVASION,
        }
    }

    /// Position in [`Strategy::ALL`] and in probability vectors.
    pub fn index(self) -> usize {
        match self {
            Strategy::Comply => 0,
            Strategy::HalfCheat => 1,
            Strategy::FullCheat => 2,
        }
    }
}

/// Per-agent inputs to an expected-utility evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecisionContext {
    /// Welfare pool divided by the population size.
    pub welfare_bonus: f64,
    /// The agent's carried-over penalty (zero or negative).
    pub penalty_debt: f64,
    /// Whether audits carry penalties this run.
    pub mechanism_enabled: bool,
}

/// Payoff model for one round.
#[derive(Clone, Copy, Debug)]
pub struct PayoffModel<'a> {
    config: &'a GameConfig,
    /// Detection ceiling for the endogenous model.
    max_catch: f64,
}

impl<'a> PayoffModel<'a> {
    /// Build the model for a round whose predecessor had the given mean
    /// evasion level (percent).
    pub fn new(config: &'a GameConfig, previous_mean_evasion: f64) -> Self {
        let max_catch = match config.detection {
            DetectionModel::Step => config.full_cheat_catch_chance,
            DetectionModel::Endogenous {
                base_max_catch,
                sensitivity,
            } => (base_max_catch + sensitivity * previous_mean_evasion / 100.0).clamp(0.0, 1.0),
        };
        Self { config, max_catch }
    }

    pub fn config(&self) -> &GameConfig {
        self.config
    }

    /// Detection ceiling in effect this round.
    pub fn max_catch(&self) -> f64 {
        self.max_catch
    }

    /// Chance that an audit catches an agent at `level` percent evasion.
    pub fn detection_probability(&self, level: f64) -> f64 {
        let p = match self.config.detection {
            DetectionModel::Step => {
                if level >= FULL_EVASION {
                    self.config.full_cheat_catch_chance
                } else if level >= HALF_EVASION {
                    self.config.half_cheat_catch_chance
                } else {
                    0.0
                }
            }
            DetectionModel::Endogenous { .. } => {
                let fraction = level / 100.0;
                self.max_catch * fraction * fraction
            }
        };
        p.clamp(0.0, 1.0)
    }

    /// Penalty for being caught at `level` percent evasion. Never positive.
    pub fn penalty(&self, level: f64) -> f64 {
        let fraction = (level / 100.0).clamp(0.0, 1.0);
        let scale = match self.config.penalty_shape {
            PenaltyShape::Linear => fraction,
            PenaltyShape::Quadratic => fraction * fraction,
        };
        -self.config.max_penalty * scale
    }

    /// Tax actually paid at `level` percent evasion.
    pub fn tax_paid(&self, level: f64) -> f64 {
        self.config.flat_tax * (1.0 - level / 100.0)
    }

    /// Expected utility of playing `strategy`.
    pub fn expected_utility(&self, strategy: Strategy, ctx: &DecisionContext) -> f64 {
        let level = strategy.percent();
        if !ctx.mechanism_enabled {
            return ctx.welfare_bonus - self.tax_paid(level);
        }

        ctx.welfare_bonus - self.config.flat_tax
            + self.config.utility_per_percent * level
            + self.detection_probability(level) * (self.penalty(level) + ctx.penalty_debt)
    }

    /// Expected utilities of all strategies, in [`Strategy::ALL`] order.
    pub fn expected_utilities(&self, ctx: &DecisionContext) -> [f64; 3] {
        Strategy::ALL.map(|s| self.expected_utility(s, ctx))
    }
}
