//! Game parameters.
//!
//! A [`GameConfig`] is built once (defaults, a TOML file, or both) and then
//! handed by value to the round engine; nothing mutates it during a run.
//!
//! ```toml
//! flat_tax = 20.0
//! welfare_base = 1000.0
//! policy = "mixed"
//!
//! [detection]
//! model = "endogenous"
//! base_max_catch = 0.3
//! sensitivity = 0.7
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How the penalty grows with the evaded share.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyShape {
    /// `-max_penalty * level / 100`
    #[default]
    Linear,
    /// `-max_penalty * (level / 100)^2`
    Quadratic,
}

/// How the audit chance is derived from an evasion level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum DetectionModel {
    /// Fixed chances per discrete level.
    Step,
    /// Quadratic in the evasion level, scaled by a ceiling that rises with
    /// the population's mean evasion in the previous round.
    Endogenous {
        /// Ceiling when nobody evades.
        base_max_catch: f64,
        /// Extra ceiling per unit of mean evasion fraction.
        sensitivity: f64,
    },
}

impl Default for DetectionModel {
    fn default() -> Self {
        Self::Step
    }
}

/// Whether the welfare base is a fixed pool or a per-head amount.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WelfareScaling {
    #[default]
    Fixed,
    PerCapita,
}

/// Payoff of a round in which no penalty is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoffScheme {
    /// Welfare bonus per head minus the tax actually paid.
    #[default]
    Welfare,
    /// Evaded percent times utility per percent.
    Evasion,
}

/// What happens to penalty debt on a new capture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtPolicy {
    /// Debt becomes this capture's penalty.
    #[default]
    Replace,
    /// This capture's penalty is added to the existing debt.
    Accumulate,
}

/// Decision rule used by every agent in a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum PolicyKind {
    /// Weighted draw over the three discrete levels.
    #[default]
    Mixed,
    /// Strictly best discrete level, ties to the lower level.
    BestResponse,
    /// Continuous level with reinforcement and post-capture scrutiny.
    Adaptive,
}

/// Parameters of the mixed-strategy weighting.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixedParams {
    /// Multiple of `|min utility|` added to every expected utility.
    pub shift_factor: f64,
    /// Multiplier for the weight of a strictly-best level. 1.0 disables it.
    pub leader_boost: f64,
}

impl Default for MixedParams {
    fn default() -> Self {
        Self {
            shift_factor: 1.5,
            leader_boost: 1.0,
        }
    }
}

/// Parameters of the continuous adaptive policy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveParams {
    /// Half-width of the uniform random walk applied each round.
    pub step: f64,
    /// Fraction of the current level dropped after a capture.
    pub learning_rate_caught: f64,
    /// Fraction of the remaining headroom gained after an unpunished round.
    pub learning_rate_not_caught: f64,
    /// Detection multiplier while under scrutiny.
    pub scrutiny_multiplier: f64,
    /// Rounds of scrutiny following a capture.
    pub scrutiny_rounds: u32,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            step: 5.0,
            learning_rate_caught: 0.5,
            learning_rate_not_caught: 0.1,
            scrutiny_multiplier: 2.0,
            scrutiny_rounds: 3,
        }
    }
}

/// Immutable parameters of one game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Utility gained per percent of tax skipped.
    pub utility_per_percent: f64,

    /// Penalty magnitude at 100% evasion.
    pub max_penalty: f64,

    pub penalty_shape: PenaltyShape,

    /// Audit chance at 50% evasion (step model).
    pub half_cheat_catch_chance: f64,

    /// Audit chance at 100% evasion (step model).
    pub full_cheat_catch_chance: f64,

    pub detection: DetectionModel,

    /// Tax every individual owes each round.
    pub flat_tax: f64,

    /// Welfare pool at full compliance.
    pub welfare_base: f64,

    pub welfare_scaling: WelfareScaling,

    pub payoff_scheme: PayoffScheme,

    pub debt_policy: DebtPolicy,

    /// Add the standing debt to the penalty charged on capture.
    pub charge_standing_debt: bool,

    /// With the mechanism off, still pay out rounds in which the audit hit.
    pub accrue_when_unenforced: bool,

    /// Evasion level every agent starts from.
    pub initial_evasion: f64,

    pub policy: PolicyKind,

    pub mixed: MixedParams,

    pub adaptive: AdaptiveParams,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            utility_per_percent: 0.5,
            max_penalty: 40.0,
            penalty_shape: PenaltyShape::Linear,
            half_cheat_catch_chance: 0.3,
            full_cheat_catch_chance: 0.75,
            detection: DetectionModel::Step,
            flat_tax: 20.0,
            welfare_base: 1000.0,
            welfare_scaling: WelfareScaling::Fixed,
            payoff_scheme: PayoffScheme::Welfare,
            debt_policy: DebtPolicy::Replace,
            charge_standing_debt: false,
            accrue_when_unenforced: true,
            initial_evasion: 50.0,
            policy: PolicyKind::Mixed,
            mixed: MixedParams::default(),
            adaptive: AdaptiveParams::default(),
        }
    }
}

impl GameConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Use a different decision policy.
    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    /// Welfare pool at full compliance for a population of `population`.
    pub fn scaled_welfare_base(&self, population: usize) -> f64 {
        match self.welfare_scaling {
            WelfareScaling::Fixed => self.welfare_base,
            WelfareScaling::PerCapita => self.welfare_base * population as f64,
        }
    }

    /// Check every parameter against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("half_cheat_catch_chance", self.half_cheat_catch_chance)?;
        check_probability("full_cheat_catch_chance", self.full_cheat_catch_chance)?;
        if self.half_cheat_catch_chance > self.full_cheat_catch_chance {
            return Err(ConfigError::invalid(
                "half_cheat_catch_chance",
                format!(
                    "{} exceeds full_cheat_catch_chance {}",
                    self.half_cheat_catch_chance, self.full_cheat_catch_chance
                ),
            ));
        }
        if let DetectionModel::Endogenous {
            base_max_catch,
            sensitivity,
        } = self.detection
        {
            check_probability("detection.base_max_catch", base_max_catch)?;
            check_non_negative("detection.sensitivity", sensitivity)?;
        }

        if !(self.flat_tax.is_finite() && self.flat_tax > 0.0) {
            return Err(ConfigError::invalid(
                "flat_tax",
                format!("must be positive, got {}", self.flat_tax),
            ));
        }
        check_non_negative("utility_per_percent", self.utility_per_percent)?;
        check_non_negative("max_penalty", self.max_penalty)?;
        check_non_negative("welfare_base", self.welfare_base)?;
        check_level("initial_evasion", self.initial_evasion)?;

        check_non_negative("mixed.shift_factor", self.mixed.shift_factor)?;
        if !(self.mixed.leader_boost.is_finite() && self.mixed.leader_boost >= 1.0) {
            return Err(ConfigError::invalid(
                "mixed.leader_boost",
                format!("must be at least 1.0, got {}", self.mixed.leader_boost),
            ));
        }

        check_level("adaptive.step", self.adaptive.step)?;
        check_probability(
            "adaptive.learning_rate_caught",
            self.adaptive.learning_rate_caught,
        )?;
        check_probability(
            "adaptive.learning_rate_not_caught",
            self.adaptive.learning_rate_not_caught,
        )?;
        if !(self.adaptive.scrutiny_multiplier.is_finite()
            && self.adaptive.scrutiny_multiplier >= 1.0)
        {
            return Err(ConfigError::invalid(
                "adaptive.scrutiny_multiplier",
                format!(
                    "must be at least 1.0, got {}",
                    self.adaptive.scrutiny_multiplier
                ),
            ));
        }

        Ok(())
    }
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("must be within [0, 1], got {value}"),
        ))
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("must be finite and non-negative, got {value}"),
        ))
    }
}

fn check_level(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("must be within [0, 100], got {value}"),
        ))
    }
}
