//! Meta controller scenarios

use std::collections::BTreeMap;

use adaptive_sizing::allocation::{is_normalized, StrategyId};
use adaptive_sizing::cli::replay;
use adaptive_sizing::config::Config;
use adaptive_sizing::control::{ControllerOutput, MarketHarmony, MetaController, RegimeAffinity};
use adaptive_sizing::risk::HealthState;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

fn seeded_config(seed: u64) -> Config {
    let mut config = Config::default();
    config.thompson.seed = Some(seed);
    config.particle.seed = Some(seed + 1);
    config
}

fn pnls(entries: &[(&str, f64)]) -> BTreeMap<StrategyId, f64> {
    entries
        .iter()
        .map(|(id, pnl)| (StrategyId::from(*id), *pnl))
        .collect()
}

fn assert_valid(output: &ControllerOutput) {
    assert!((0.0..=1.0).contains(&output.risk_multiplier));
    assert!(output.drawdown_pct.is_finite());
    assert!(output.vol_ratio.is_finite());
    if !output.strategy_weights.is_empty() {
        let allow_zero = output.health_state == HealthState::Defensive;
        assert!(is_normalized(&output.strategy_weights, allow_zero));
    }
}

/// Random walk of market returns, equity and strategy PnL
fn simulate(controller: &mut MetaController, seed: u64, ticks: usize) -> Vec<ControllerOutput> {
    let mut rng = StdRng::seed_from_u64(seed);
    let returns = Normal::new(0.0, 0.01).unwrap();
    let ids = ["momentum", "reversion", "carry"];
    let mut equity = 10_000.0;
    let mut outputs = Vec::with_capacity(ticks);

    for _ in 0..ticks {
        let market_return = returns.sample(&mut rng);
        let strategy_pnls: BTreeMap<StrategyId, f64> = ids
            .iter()
            .map(|id| (StrategyId::from(*id), rng.gen_range(-20.0..20.0)))
            .collect();
        equity += strategy_pnls.values().sum::<f64>();
        outputs.push(controller.tick(market_return, equity, &strategy_pnls));
    }
    outputs
}

#[test]
fn test_outputs_always_valid() {
    let mut controller = MetaController::new(&seeded_config(1)).unwrap();
    for output in simulate(&mut controller, 1, 1_000) {
        assert!(!output.degraded);
        assert_valid(&output);
    }
    assert_eq!(controller.strategies().count(), 3);
}

#[test]
fn test_seeded_controllers_match() {
    let run = || {
        let mut controller = MetaController::new(&seeded_config(4)).unwrap();
        simulate(&mut controller, 4, 300)
            .into_iter()
            .map(|o| (o.risk_multiplier, o.strategy_weights, o.health_state, o.harmony))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_defensive_zeroes_new_strategy() {
    let mut controller = MetaController::new(&seeded_config(2)).unwrap();
    let veteran = StrategyId::from("veteran");
    let rookie = StrategyId::from("rookie");

    for _ in 0..25 {
        controller.tick(0.001, 100.0, &pnls(&[("veteran", 1.0)]));
    }
    assert_eq!(controller.performance(&veteran).unwrap().observations, 25);

    // 15% drawdown is past the halt level
    let output = controller.tick(-0.02, 85.0, &pnls(&[("rookie", 3.0)]));
    assert_eq!(output.health_state, HealthState::Defensive);
    assert_eq!(output.weight(&rookie), 0.0);
    assert_eq!(output.weight(&veteran), 1.0);

    // Registered without any history
    controller
        .register_strategy("silent", RegimeAffinity::default())
        .unwrap();
    let output = controller.tick(0.0, 85.0, &BTreeMap::new());
    assert_eq!(output.health_state, HealthState::Defensive);
    assert_eq!(output.weight(&StrategyId::from("silent")), 0.0);
    assert_valid(&output);
}

#[test]
fn test_defensive_without_track_record_is_flat() {
    let mut controller = MetaController::new(&seeded_config(3)).unwrap();
    controller.tick(0.0, 100.0, &pnls(&[("a", 1.0), ("b", -1.0)]));
    let output = controller.tick(0.0, 50.0, &pnls(&[("a", 1.0), ("b", -1.0)]));
    assert_eq!(output.health_state, HealthState::Defensive);
    assert!(output.strategy_weights.values().all(|w| *w == 0.0));
    assert_valid(&output);
}

#[test]
fn test_health_stable_around_halt_drawdown() {
    let mut controller = MetaController::new(&seeded_config(9)).unwrap();
    controller.tick(0.0, 1_000.0, &BTreeMap::new());

    let mut previous = None;
    let mut transitions = 0;
    for i in 0..30 {
        // Drawdown alternates 10% / 9.9%
        let equity = if i % 2 == 0 { 900.0 } else { 901.0 };
        let output = controller.tick(0.0, equity, &BTreeMap::new());
        if previous.is_some_and(|p| p != output.health_state) {
            transitions += 1;
        }
        previous = Some(output.health_state);
    }
    assert_eq!(transitions, 0);
    assert_eq!(previous, Some(HealthState::Defensive));
}

#[test]
fn test_drawdown_throttles_risk() {
    let mut controller = MetaController::new(&seeded_config(5)).unwrap();
    let mut outputs = Vec::new();
    for equity in (91..=100).rev() {
        outputs.push(controller.tick(0.0, equity as f64, &BTreeMap::new()));
    }
    // Equity falls 1% per tick; throttling starts past the 5% target
    assert_eq!(outputs[0].risk_multiplier, 1.0);
    let tail = &outputs[6..];
    for pair in tail.windows(2) {
        assert!(pair[1].risk_multiplier < pair[0].risk_multiplier);
    }
    assert!(outputs.iter().all(|o| o.harmony == MarketHarmony::Consonant));
}

#[test]
fn test_regime_reported_after_warm_up() {
    let mut controller = MetaController::new(&seeded_config(6)).unwrap();
    let mut rng = StdRng::seed_from_u64(6);
    let noise = Normal::new(0.0, 0.01).unwrap();
    let min_samples = controller.config().regime.min_samples;

    for i in 1..=min_samples {
        let output = controller.tick(noise.sample(&mut rng), 100.0, &BTreeMap::new());
        assert_eq!(output.regime_classification.is_unknown(), i < min_samples);
    }
}

#[test]
fn test_reset_restarts_from_clean_state() {
    let mut controller = MetaController::new(&seeded_config(7)).unwrap();
    simulate(&mut controller, 7, 200);
    controller.reset();

    assert_eq!(controller.strategies().count(), 3);
    assert!(controller.regime().is_unknown());
    let output = controller.tick(0.0, 1.0, &BTreeMap::new());
    assert_eq!(output.tick, 1);
    assert_eq!(output.health_state, HealthState::Nominal);
    assert_eq!(output.risk_multiplier, 1.0);
}

#[test]
fn test_replay_stream() {
    let mut controller = MetaController::new(&seeded_config(8)).unwrap();
    let input: String = (0..50)
        .map(|i| {
            format!(
                "{{\"market_return\": {}, \"equity\": {}, \"strategy_pnls\": {{\"a\": {}}}}}\n",
                (i as f64 * 0.3).sin() * 0.01,
                1_000.0 + i as f64,
                if i % 3 == 0 { -1.0 } else { 1.5 }
            )
        })
        .collect();

    let mut out = Vec::new();
    let summary = replay(&mut controller, input.as_bytes(), &mut out).unwrap();
    assert_eq!(summary.ticks, 50);
    assert_eq!(summary.skipped, 0);

    let last: ControllerOutput = serde_json::from_str(
        String::from_utf8(out).unwrap().lines().last().unwrap(),
    )
    .unwrap();
    assert_eq!(last.tick, 50);
    assert_valid(&last);
}
