//! Property tests for the Monte Carlo engine

use adopt_sim::{
    ExecutionMode, LatentTraits, MonteCarloEngine, ScenarioModifiers, ScorecardParams,
    RATE_SUM_TOLERANCE,
};
use proptest::prelude::*;

fn unit() -> impl Strategy<Value = f64> {
    0.0..=1.0f64
}

fn traits() -> impl Strategy<Value = LatentTraits> {
    (unit(), unit(), unit(), unit())
        .prop_map(|(c, t, f, e)| LatentTraits::new(c, t, f, e).unwrap())
}

fn scorecard() -> impl Strategy<Value = ScorecardParams> {
    (unit(), unit(), unit(), unit())
        .prop_map(|(c, e, r, t)| ScorecardParams::new(c, e, r, t).unwrap())
}

fn modifiers() -> impl Strategy<Value = ScenarioModifiers> {
    (-1.0..=1.0f64, -1.0..=1.0f64, -1.0..=1.0f64, unit())
        .prop_map(|(t, f, m, c)| ScenarioModifiers::new(t, f, m, c).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_rates_sum_to_one(
        population in proptest::collection::vec(traits(), 1..8),
        card in scorecard(),
        mods in modifiers(),
        n in 1..40u32,
        sigma in unit(),
        seed in any::<u64>(),
    ) {
        let run = MonteCarloEngine::new()
            .run(&population, &card, &mods, n, sigma, seed)
            .unwrap();
        let sum = run.results.rate_sum();
        prop_assert!((1.0 - RATE_SUM_TOLERANCE..=1.0 + RATE_SUM_TOLERANCE).contains(&sum));
        prop_assert_eq!(run.counts.total(), population.len() as u64 * u64::from(n));
    }

    #[test]
    fn prop_same_seed_is_bit_identical(
        population in proptest::collection::vec(traits(), 1..8),
        card in scorecard(),
        n in 1..40u32,
        seed in any::<u64>(),
    ) {
        let mods = ScenarioModifiers::exploration_baseline();
        let engine = MonteCarloEngine::new();
        let a = engine.run(&population, &card, &mods, n, 0.1, seed).unwrap();
        let b = engine.run(&population, &card, &mods, n, 0.1, seed).unwrap();
        prop_assert_eq!(a.results.success_rate().to_bits(), b.results.success_rate().to_bits());
        prop_assert_eq!(a.results.fail_rate().to_bits(), b.results.fail_rate().to_bits());
        prop_assert_eq!(a.results.did_not_try_rate().to_bits(), b.results.did_not_try_rate().to_bits());
    }

    #[test]
    fn prop_execution_mode_does_not_change_results(
        population in proptest::collection::vec(traits(), 1..12),
        card in scorecard(),
        seed in any::<u64>(),
    ) {
        let mods = ScenarioModifiers::exploration_baseline();
        let seq = MonteCarloEngine::new()
            .with_mode(ExecutionMode::Sequential)
            .run(&population, &card, &mods, 20, 0.2, seed)
            .unwrap();
        let par = MonteCarloEngine::new()
            .with_mode(ExecutionMode::Parallel)
            .run(&population, &card, &mods, 20, 0.2, seed)
            .unwrap();
        prop_assert_eq!(seq.counts, par.counts);
    }
}

/// Five identical synths, sigma 0.1, 50 executions, seed 42, flat 0.3 scorecard
#[test]
fn reference_scenario_is_reproducible() {
    let population = vec![LatentTraits::new(0.6, 0.5, 0.5, 0.5).unwrap(); 5];
    let card = ScorecardParams::new(0.3, 0.3, 0.3, 0.3).unwrap();
    let mods = ScenarioModifiers::exploration_baseline();
    let engine = MonteCarloEngine::new();

    let first = engine.run(&population, &card, &mods, 50, 0.1, 42).unwrap();
    let second = engine.run(&population, &card, &mods, 50, 0.1, 42).unwrap();

    assert!((0.0..=1.0).contains(&first.results.success_rate()));
    assert_eq!(
        first.results.success_rate().to_bits(),
        second.results.success_rate().to_bits()
    );
    assert_eq!(first.counts, second.counts);
}
