//! Property-based tests for the payoff model and decision policies.

use std::num::NonZeroUsize;

use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use tax_game::{
    policy::{best_index, mixed_weights, sample_index},
    DecisionContext, DetectionModel, GameConfig, PayoffModel, Population, RoundEngine, Strategy,
};

fn endogenous(base_max_catch: f64, sensitivity: f64) -> GameConfig {
    GameConfig {
        detection: DetectionModel::Endogenous {
            base_max_catch,
            sensitivity,
        },
        ..Default::default()
    }
}

proptest! {
    /// Mixed weights always form a probability distribution.
    #[test]
    fn prop_mixed_weights_are_distribution(
        u in prop::array::uniform3(-1.0e6f64..1.0e6),
        shift in 0.0f64..5.0,
        boost in 1.0f64..4.0,
    ) {
        let p = mixed_weights(u, shift, boost);
        prop_assert!(p.iter().all(|&w| w >= 0.0), "negative weight in {:?}", p);
        prop_assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9, "sum of {:?}", p);
    }

    /// The best index is never beaten and prefers lower levels on ties.
    #[test]
    fn prop_best_index_is_maximal(u in prop::array::uniform3(-100i32..100)) {
        let u = u.map(f64::from);
        let best = best_index(&u);
        prop_assert!(u.iter().all(|&x| x <= u[best]));
        prop_assert!(u[..best].iter().all(|&x| x < u[best]));
    }

    /// Sampling never lands on a zero-probability level.
    #[test]
    fn prop_sample_respects_support(
        u in prop::array::uniform3(-50.0f64..50.0),
        seed in any::<u64>(),
    ) {
        let p = mixed_weights(u, 0.0, 1.0);
        let mut rng = StdRng::seed_from_u64(seed);
        let idx = sample_index(&p, &mut rng);
        prop_assert!(p[idx] > 0.0);
    }

    /// Detection chance and penalty are monotone in the evasion level.
    #[test]
    fn prop_detection_and_penalty_monotone(
        a in 0.0f64..=100.0,
        b in 0.0f64..=100.0,
        base in 0.0f64..=1.0,
        sensitivity in 0.0f64..2.0,
        mean in 0.0f64..=100.0,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        for config in [GameConfig::default(), endogenous(base, sensitivity)] {
            let model = PayoffModel::new(&config, mean);
            let (p_lo, p_hi) = (model.detection_probability(lo), model.detection_probability(hi));
            prop_assert!((0.0..=1.0).contains(&p_lo) && (0.0..=1.0).contains(&p_hi));
            prop_assert!(p_lo <= p_hi);
            prop_assert!(model.penalty(hi) <= model.penalty(lo));
            prop_assert!(model.penalty(lo) <= 0.0);
            prop_assert_eq!(model.detection_probability(0.0), 0.0);
        }
    }

    /// Expected utility depends only on its inputs.
    #[test]
    fn prop_expected_utility_is_pure(
        bonus in -100.0f64..1000.0,
        debt in -200.0f64..=0.0,
        enabled in any::<bool>(),
    ) {
        let config = GameConfig::default();
        let model = PayoffModel::new(&config, 50.0);
        let ctx = DecisionContext { welfare_bonus: bonus, penalty_debt: debt, mechanism_enabled: enabled };

        for strategy in Strategy::ALL {
            prop_assert_eq!(
                model.expected_utility(strategy, &ctx),
                model.expected_utility(strategy, &ctx)
            );
        }
        prop_assert_eq!(model.expected_utilities(&ctx), model.expected_utilities(&ctx));
    }

    /// A penalty debt never makes cheating more attractive.
    #[test]
    fn prop_debt_discourages_cheating(
        bonus in 0.0f64..500.0,
        debt in -200.0f64..=0.0,
    ) {
        let config = GameConfig::default();
        let model = PayoffModel::new(&config, 0.0);
        let clean = DecisionContext { welfare_bonus: bonus, penalty_debt: 0.0, mechanism_enabled: true };
        let indebted = DecisionContext { penalty_debt: debt, ..clean };

        let before = model.expected_utilities(&clean);
        let after = model.expected_utilities(&indebted);
        prop_assert_eq!(before[0], after[0]);
        prop_assert!(after[1] <= before[1]);
        prop_assert!(after[2] <= before[2]);
    }

    /// The welfare pool stays within [0, base] for any run.
    #[test]
    fn prop_welfare_within_base(
        population in 1usize..12,
        rounds in 1u64..15,
        seed in any::<u64>(),
        mechanism in any::<bool>(),
    ) {
        let size = NonZeroUsize::new(population).unwrap();
        let mut engine = RoundEngine::new(GameConfig::default(), size, mechanism);
        let mut agents = Population::new(size, 50.0);
        let mut rng = StdRng::seed_from_u64(seed);

        for round in 1..=rounds {
            let summary = engine.run_round(round, &mut agents, &mut rng, &mut |_| {});
            prop_assert!((0.0..=1.0).contains(&summary.compliance_rate));
            prop_assert!(engine.welfare() >= 0.0);
            prop_assert!(engine.welfare() <= engine.welfare_base());
        }
    }
}
