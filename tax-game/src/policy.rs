//! Decision policies: how an individual picks its evasion level.
//!
//! Three interchangeable rules share the [`DecisionPolicy`] trait:
//!
//! | Policy                  | Levels      | Choice                              |
//! |-------------------------|-------------|-------------------------------------|
//! | [`MixedStrategy`]       | 0 / 50 / 100 | weighted draw over shifted utilities |
//! | [`BestResponse`]        | 0 / 50 / 100 | strictly best, ties to lower level   |
//! | [`AdaptiveEvasion`]     | [0, 100]    | random walk plus reinforcement       |

use rand::{Rng, RngCore};

use crate::agent::Individual;
use crate::config::{AdaptiveParams, GameConfig, MixedParams, PolicyKind};
use crate::payoff::{DecisionContext, PayoffModel, Strategy};

/// Decision rule applied to every individual each round.
pub trait DecisionPolicy: std::fmt::Debug + Send + Sync {
    /// Set `agent.evasion` (and the reported probabilities) for this round.
    fn decide(
        &self,
        agent: &mut Individual,
        ctx: &DecisionContext,
        model: &PayoffModel<'_>,
        rng: &mut dyn RngCore,
    );

    /// Factor applied to the agent's detection probability this round.
    fn detection_multiplier(&self, _agent: &Individual) -> f64 {
        1.0
    }

    /// Called after the audit with whether a penalty was applied.
    fn after_audit(&self, _agent: &mut Individual, _penalized: bool) {}

    /// Name for reporting.
    fn name(&self) -> &'static str;
}

/// Build the policy selected by `config.policy`.
pub fn policy_for(config: &GameConfig) -> Box<dyn DecisionPolicy> {
    match config.policy {
        PolicyKind::Mixed => Box::new(MixedStrategy::new(config.mixed)),
        PolicyKind::BestResponse => Box::new(BestResponse),
        PolicyKind::Adaptive => Box::new(AdaptiveEvasion::new(config.adaptive)),
    }
}

/// Turn three expected utilities into a probability vector.
///
/// Every utility is shifted up by `shift_factor * |min|` and the result is
/// normalized. Levels are visited in order 0, 50, 100; a level that strictly
/// beats the others as they stand at that point (earlier levels already
/// shifted or boosted) has its shifted value multiplied by `leader_boost`.
/// Falls back to uniform weights when nothing is left to normalize.
pub fn mixed_weights(utilities: [f64; 3], shift_factor: f64, leader_boost: f64) -> [f64; 3] {
    let smallest = utilities.iter().copied().fold(f64::INFINITY, f64::min);
    let shift = shift_factor * smallest.abs();

    let mut weights = utilities;
    for i in 0..3 {
        let leads = (0..3).all(|j| j == i || weights[i] > weights[j]);
        weights[i] += shift;
        if leads {
            weights[i] *= leader_boost;
        }
    }
    let weights = weights.map(|w| w.max(0.0));

    let total: f64 = weights.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return [1.0 / 3.0; 3];
    }
    weights.map(|w| w / total)
}

/// Index of the best utility, ties broken toward the lower index.
pub fn best_index(utilities: &[f64; 3]) -> usize {
    let mut best = 0;
    for i in 1..3 {
        if utilities[i] > utilities[best] {
            best = i;
        }
    }
    best
}

/// Draw an index from a probability vector.
pub fn sample_index(probabilities: &[f64; 3], rng: &mut dyn RngCore) -> usize {
    let roll: f64 = rng.gen();
    let mut cumulative = 0.0;
    let mut fallback = 0;
    for (i, &p) in probabilities.iter().enumerate() {
        if p <= 0.0 {
            continue;
        }
        cumulative += p;
        fallback = i;
        if roll < cumulative {
            return i;
        }
    }
    // Rounding left the cumulative sum just below the roll.
    fallback
}

/// Randomized choice among the discrete levels.
#[derive(Clone, Copy, Debug)]
pub struct MixedStrategy {
    params: MixedParams,
}

impl MixedStrategy {
    pub fn new(params: MixedParams) -> Self {
        Self { params }
    }
}

impl Default for MixedStrategy {
    fn default() -> Self {
        Self::new(MixedParams::default())
    }
}

impl DecisionPolicy for MixedStrategy {
    fn decide(
        &self,
        agent: &mut Individual,
        ctx: &DecisionContext,
        model: &PayoffModel<'_>,
        rng: &mut dyn RngCore,
    ) {
        let utilities = model.expected_utilities(ctx);
        let probabilities =
            mixed_weights(utilities, self.params.shift_factor, self.params.leader_boost);
        let choice = Strategy::ALL[sample_index(&probabilities, rng)];

        tracing::trace!(
            agent = %agent.id(),
            ?utilities,
            ?probabilities,
            level = choice.percent(),
            "mixed decision"
        );

        agent.strategy_probabilities = Some(probabilities);
        agent.evasion = choice.percent();
    }

    fn name(&self) -> &'static str {
        "mixed"
    }
}

/// Deterministic choice of the strictly best discrete level.
#[derive(Clone, Copy, Debug, Default)]
pub struct BestResponse;

impl DecisionPolicy for BestResponse {
    fn decide(
        &self,
        agent: &mut Individual,
        ctx: &DecisionContext,
        model: &PayoffModel<'_>,
        _rng: &mut dyn RngCore,
    ) {
        let utilities = model.expected_utilities(ctx);
        let best = best_index(&utilities);

        let mut probabilities = [0.0; 3];
        probabilities[best] = 1.0;

        tracing::trace!(agent = %agent.id(), ?utilities, best, "best response");

        agent.strategy_probabilities = Some(probabilities);
        agent.evasion = Strategy::ALL[best].percent();
    }

    fn name(&self) -> &'static str {
        "best-response"
    }
}

/// Continuous evasion that drifts randomly and learns from audits.
#[derive(Clone, Copy, Debug)]
pub struct AdaptiveEvasion {
    params: AdaptiveParams,
}

impl AdaptiveEvasion {
    pub fn new(params: AdaptiveParams) -> Self {
        Self { params }
    }
}

impl Default for AdaptiveEvasion {
    fn default() -> Self {
        Self::new(AdaptiveParams::default())
    }
}

impl DecisionPolicy for AdaptiveEvasion {
    fn decide(
        &self,
        agent: &mut Individual,
        _ctx: &DecisionContext,
        _model: &PayoffModel<'_>,
        rng: &mut dyn RngCore,
    ) {
        let step = self.params.step;
        let drift = if step > 0.0 {
            rng.gen_range(-step..=step)
        } else {
            0.0
        };
        agent.evasion = (agent.evasion + drift).clamp(0.0, 100.0);
        agent.strategy_probabilities = None;

        tracing::trace!(agent = %agent.id(), drift, level = agent.evasion, "adaptive step");
    }

    fn detection_multiplier(&self, agent: &Individual) -> f64 {
        if agent.under_scrutiny() {
            self.params.scrutiny_multiplier
        } else {
            1.0
        }
    }

    fn after_audit(&self, agent: &mut Individual, penalized: bool) {
        if penalized {
            agent.evasion -= self.params.learning_rate_caught * agent.evasion;
            agent.scrutiny_rounds_left = self.params.scrutiny_rounds;
        } else {
            agent.evasion += self.params.learning_rate_not_caught * (100.0 - agent.evasion);
            agent.scrutiny_rounds_left = agent.scrutiny_rounds_left.saturating_sub(1);
        }
        agent.evasion = agent.evasion.clamp(0.0, 100.0);
    }

    fn name(&self) -> &'static str {
        "adaptive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentId;
    use rand::rngs::mock::StepRng;
    use rand::{rngs::StdRng, SeedableRng};

    fn assert_distribution(p: [f64; 3]) {
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9, "{p:?}");
        assert!(p.iter().all(|&x| x >= 0.0), "{p:?}");
    }

    #[test]
    fn test_mixed_weights_shift() {
        // min = -20, shift = 30 -> [10, 29, 30]
        let p = mixed_weights([-20.0, -1.0, 0.0], 1.5, 1.0);
        assert_distribution(p);
        assert!((p[0] - 10.0 / 69.0).abs() < 1e-12);
        assert!((p[1] - 29.0 / 69.0).abs() < 1e-12);
        assert!((p[2] - 30.0 / 69.0).abs() < 1e-12);
    }

    #[test]
    fn test_mixed_weights_equal_utilities_are_uniform() {
        for u in [-7.0, 0.0, 3.5] {
            let p = mixed_weights([u; 3], 1.5, 2.0);
            for x in p {
                assert!((x - 1.0 / 3.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_mixed_weights_positive_minimum() {
        // min = 10, shift = 15 -> [25, 35, 45]
        let p = mixed_weights([10.0, 20.0, 30.0], 1.5, 1.0);
        assert_distribution(p);
        assert!((p[2] - 45.0 / 105.0).abs() < 1e-12);
    }

    #[test]
    fn test_leader_boost_compares_against_updated_levels() {
        // shift = 30; 0 does not beat 10 once the comply level is shifted.
        let p = mixed_weights([-20.0, -1.0, 0.0], 1.5, 2.0);
        assert_distribution(p);
        for (got, want) in p.iter().zip([10.0, 29.0, 30.0]) {
            assert!((got - want / 69.0).abs() < 1e-12, "{p:?}");
        }

        // shift = 45 -> [15, 55, 40], nothing boosted.
        let p = mixed_weights([-30.0, 10.0, -5.0], 1.5, 2.0);
        for (got, want) in p.iter().zip([15.0, 55.0, 40.0]) {
            assert!((got - want / 110.0).abs() < 1e-12, "{p:?}");
        }

        // Comply leads the raw values: (10 + 15) * 2 -> [50, 10, 5].
        let p = mixed_weights([10.0, -5.0, -10.0], 1.5, 2.0);
        for (got, want) in p.iter().zip([50.0, 10.0, 5.0]) {
            assert!((got - want / 65.0).abs() < 1e-12, "{p:?}");
        }

        // No strict leader, nothing boosted.
        let tied = mixed_weights([-20.0, 0.0, 0.0], 1.5, 2.0);
        assert!((tied[1] - tied[2]).abs() < 1e-12);
    }

    #[test]
    fn test_best_index_ties_to_lower_level() {
        assert_eq!(best_index(&[1.0, 1.0, 1.0]), 0);
        assert_eq!(best_index(&[0.0, 2.0, 2.0]), 1);
        assert_eq!(best_index(&[0.0, 1.0, 2.0]), 2);
    }

    #[test]
    fn test_sample_index_skips_zero_weights() {
        let mut rng = StepRng::new(0, 0);
        assert_eq!(sample_index(&[0.0, 0.0, 1.0], &mut rng), 2);
        assert_eq!(sample_index(&[0.0, 0.5, 0.5], &mut rng), 1);
    }

    #[test]
    fn test_sample_index_frequencies() {
        let mut rng = StdRng::seed_from_u64(7);
        let probabilities = [0.2, 0.3, 0.5];
        let mut counts = [0usize; 3];
        for _ in 0..20_000 {
            counts[sample_index(&probabilities, &mut rng)] += 1;
        }
        for i in 0..3 {
            let freq = counts[i] as f64 / 20_000.0;
            assert!((freq - probabilities[i]).abs() < 0.02, "{counts:?}");
        }
    }

    #[test]
    fn test_mixed_strategy_sets_probabilities() {
        let config = GameConfig::default();
        let model = PayoffModel::new(&config, 0.0);
        let ctx = DecisionContext {
            welfare_bonus: 0.0,
            penalty_debt: 0.0,
            mechanism_enabled: true,
        };
        let mut agent = Individual::new(AgentId(1), 50.0);
        let mut rng = StdRng::seed_from_u64(1);

        MixedStrategy::default().decide(&mut agent, &ctx, &model, &mut rng);

        assert_distribution(agent.strategy_probabilities.unwrap());
        assert!([0.0, 50.0, 100.0].contains(&agent.evasion));
    }

    #[test]
    fn test_best_response_picks_full_cheat_with_defaults() {
        let config = GameConfig::default();
        let model = PayoffModel::new(&config, 0.0);
        let ctx = DecisionContext {
            welfare_bonus: 0.0,
            penalty_debt: 0.0,
            mechanism_enabled: true,
        };
        let mut agent = Individual::new(AgentId(1), 50.0);

        BestResponse.decide(&mut agent, &ctx, &model, &mut StepRng::new(0, 0));

        assert_eq!(agent.evasion, 100.0);
        assert_eq!(agent.strategy_probabilities, Some([0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_adaptive_learning_and_scrutiny() {
        let policy = AdaptiveEvasion::new(AdaptiveParams {
            step: 0.0,
            learning_rate_caught: 0.5,
            learning_rate_not_caught: 0.1,
            scrutiny_multiplier: 3.0,
            scrutiny_rounds: 2,
        });
        let mut agent = Individual::new(AgentId(1), 60.0);

        policy.after_audit(&mut agent, true);
        assert_eq!(agent.evasion, 30.0);
        assert_eq!(policy.detection_multiplier(&agent), 3.0);

        policy.after_audit(&mut agent, false);
        assert!((agent.evasion - 37.0).abs() < 1e-12);
        assert_eq!(agent.scrutiny_rounds_left, 1);

        policy.after_audit(&mut agent, false);
        assert_eq!(agent.scrutiny_rounds_left, 0);
        assert_eq!(policy.detection_multiplier(&agent), 1.0);
    }

    #[test]
    fn test_adaptive_walk_stays_in_bounds() {
        let config = GameConfig::default();
        let model = PayoffModel::new(&config, 0.0);
        let ctx = DecisionContext {
            welfare_bonus: 0.0,
            penalty_debt: 0.0,
            mechanism_enabled: true,
        };
        let policy = AdaptiveEvasion::new(AdaptiveParams {
            step: 40.0,
            ..Default::default()
        });
        let mut agent = Individual::new(AgentId(1), 95.0);
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..500 {
            policy.decide(&mut agent, &ctx, &model, &mut rng);
            assert!((0.0..=100.0).contains(&agent.evasion));
            assert!(agent.strategy_probabilities.is_none());
        }
    }
}
