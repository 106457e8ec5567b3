//! Individuals and the population that owns them.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// Unique identifier for an individual, assigned 1..=N at population creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u64);

impl AgentId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl From<u64> for AgentId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One member of the population.
///
/// Discrete policies keep `evasion` on {0, 50, 100}; the adaptive policy
/// moves it anywhere in [0, 100].
#[derive(Clone, Debug, PartialEq)]
pub struct Individual {
    id: AgentId,

    /// Percent of the flat tax evaded this round.
    pub evasion: f64,

    /// Sum of all round payoffs so far.
    pub utility: f64,

    /// Rounds in which a penalty was applied.
    pub times_caught: u32,

    /// Penalty carried over from captures (zero or negative).
    pub penalty_debt: f64,

    /// Weights over {0, 50, 100} from the last discrete decision.
    pub strategy_probabilities: Option<[f64; 3]>,

    /// Remaining rounds of heightened detection.
    pub scrutiny_rounds_left: u32,
}

impl Individual {
    /// Create an individual with no history.
    pub fn new(id: AgentId, initial_evasion: f64) -> Self {
        Self {
            id,
            evasion: initial_evasion.clamp(0.0, 100.0),
            utility: 0.0,
            times_caught: 0,
            penalty_debt: 0.0,
            strategy_probabilities: None,
            scrutiny_rounds_left: 0,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Whether detection is currently multiplied.
    pub fn under_scrutiny(&self) -> bool {
        self.scrutiny_rounds_left > 0
    }
}

/// Fixed-size, ordered collection of individuals.
#[derive(Clone, Debug)]
pub struct Population {
    agents: Vec<Individual>,
}

impl Population {
    /// Create `size` individuals with ids 1..=size.
    pub fn new(size: NonZeroUsize, initial_evasion: f64) -> Self {
        let agents = (1..=size.get() as u64)
            .map(|id| Individual::new(AgentId(id), initial_evasion))
            .collect();
        Self { agents }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Always false; a population has at least one member.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Individual> {
        self.agents.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Individual> {
        self.agents.iter_mut()
    }

    pub fn get(&self, id: AgentId) -> Option<&Individual> {
        id.0
            .checked_sub(1)
            .and_then(|idx| self.agents.get(idx as usize))
    }
}
