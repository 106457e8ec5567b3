//! Simulation driver.

use std::num::{NonZeroU64, NonZeroUsize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::{rngs::StdRng, SeedableRng};

use crate::agent::Population;
use crate::config::GameConfig;
use crate::engine::RoundEngine;
use crate::report::{RoundEvent, SummaryReport};

const DEFAULT_POPULATION: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(n) => n,
    None => panic!("zero default population"),
};

const DEFAULT_ROUNDS: NonZeroU64 = match NonZeroU64::new(100) {
    Some(n) => n,
    None => panic!("zero default rounds"),
};

/// Configuration for a simulation run.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    /// Number of individuals.
    pub population: NonZeroUsize,

    /// Number of rounds to simulate.
    pub rounds: NonZeroU64,

    /// Whether audits carry penalties.
    pub mechanism_enabled: bool,

    /// Seed for the random source; a fresh one is drawn when absent.
    pub seed: Option<u64>,

    /// Game parameters.
    pub game: GameConfig,
}

impl SimulationConfig {
    pub fn new(population: NonZeroUsize, rounds: NonZeroU64, mechanism_enabled: bool) -> Self {
        Self {
            population,
            rounds,
            mechanism_enabled,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_game(mut self, game: GameConfig) -> Self {
        self.game = game;
        self
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            population: DEFAULT_POPULATION,
            rounds: DEFAULT_ROUNDS,
            mechanism_enabled: true,
            seed: None,
            game: GameConfig::default(),
        }
    }
}

/// Cooperative cancellation flag, checked before each round.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop before its next round.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Run `rounds` rounds over `population` individuals with default game
/// parameters and a fresh seed.
pub fn run<E>(
    population: NonZeroUsize,
    rounds: NonZeroU64,
    mechanism_enabled: bool,
    on_event: E,
    on_progress: Option<&mut dyn FnMut(u64, u64)>,
) -> SummaryReport
where
    E: FnMut(&RoundEvent),
{
    let config = SimulationConfig::new(population, rounds, mechanism_enabled);
    match on_progress {
        Some(progress) => run_simulation(&config, on_event, progress, None),
        None => run_simulation(&config, on_event, |_, _| {}, None),
    }
}

/// Run a simulation to completion or until `cancel` is set.
///
/// `on_event` sees every individual's outcome in round and population order;
/// `on_progress` is called with `(round, total_rounds)` after each round.
pub fn run_simulation<E, P>(
    config: &SimulationConfig,
    mut on_event: E,
    mut on_progress: P,
    cancel: Option<&CancelToken>,
) -> SummaryReport
where
    E: FnMut(&RoundEvent),
    P: FnMut(u64, u64),
{
    let seed = config.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    let total_rounds = config.rounds.get();

    let mut population = Population::new(config.population, config.game.initial_evasion);
    let mut engine = RoundEngine::new(
        config.game.clone(),
        config.population,
        config.mechanism_enabled,
    );

    tracing::info!(
        population = config.population.get(),
        rounds = total_rounds,
        mechanism_enabled = config.mechanism_enabled,
        policy = engine.policy().name(),
        seed,
        "starting simulation"
    );

    let mut history = Vec::with_capacity(total_rounds.min(1 << 16) as usize);
    let mut cancelled = false;

    for round in 1..=total_rounds {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            tracing::info!(round, "simulation cancelled");
            cancelled = true;
            break;
        }

        let summary = engine.run_round(round, &mut population, &mut rng, &mut on_event);
        history.push(summary);
        on_progress(round, total_rounds);
    }

    let report = SummaryReport::from_population(
        &population,
        engine.welfare_percent(),
        history,
        seed,
        cancelled,
    );

    tracing::info!(
        rounds_completed = report.rounds_completed,
        average_utility = report.average_utility,
        min_utility = report.min_utility,
        max_utility = report.max_utility,
        final_welfare_percent = report.final_welfare_percent,
        "simulation finished"
    );

    report
}
