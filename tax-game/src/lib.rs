//! Repeated tax compliance game.
//!
//! A population of individuals owes a flat tax every round and chooses how
//! much of it to evade. Audits catch evaders with a probability that grows
//! with the evaded share; caught individuals pay a penalty that also weighs
//! on their future decisions. Taxes actually paid fund a shared welfare pool
//! that is split evenly at the start of the next round, so individually
//! rational evasion erodes a resource everyone draws on.
//!
//! ## Components
//!
//! | Module      | Role                                                         |
//! |-------------|--------------------------------------------------------------|
//! | [`payoff`]  | Audit chances, penalties, expected utilities (pure)          |
//! | [`agent`]   | Individual state and the population                          |
//! | [`policy`]  | Mixed strategy, best response, adaptive continuous evasion   |
//! | [`engine`]  | One round: decisions, audits, payoffs, welfare feedback      |
//! | [`runner`]  | Sequential driver with events, progress and cancellation     |
//! | [`worker`]  | Driver on a background thread, streaming over a channel      |
//! | [`compare`] | Paired trials with and without the audit mechanism          |
//!
//! ## Example
//!
//! ```
//! use std::num::{NonZeroU64, NonZeroUsize};
//! use tax_game::{run_simulation, SimulationConfig};
//!
//! let config = SimulationConfig::new(
//!     NonZeroUsize::new(10).unwrap(),
//!     NonZeroU64::new(50).unwrap(),
//!     true,
//! )
//! .with_seed(7);
//!
//! let report = run_simulation(&config, |_event| {}, |_round, _total| {}, None);
//! assert_eq!(report.per_agent.len(), 10);
//! ```

pub mod agent;
pub mod compare;
pub mod config;
pub mod engine;
pub mod payoff;
pub mod policy;
pub mod report;
pub mod runner;
pub mod worker;

mod error;

pub use agent::{AgentId, Individual, Population};
pub use compare::{compare_mechanism, ArmSummary, MechanismComparison};
pub use config::{
    AdaptiveParams, DebtPolicy, DetectionModel, GameConfig, MixedParams, PayoffScheme,
    PenaltyShape, PolicyKind, WelfareScaling,
};
pub use engine::{RoundEngine, Settlement};
pub use error::ConfigError;
pub use payoff::{DecisionContext, PayoffModel, Strategy};
pub use policy::{
    policy_for, AdaptiveEvasion, BestResponse, DecisionPolicy, MixedStrategy,
};
pub use report::{AgentSummary, RoundEvent, RoundSummary, SummaryReport};
pub use runner::{run, run_simulation, CancelToken, SimulationConfig};
pub use worker::{spawn_simulation, SimulationHandle, SimulationMessage};
