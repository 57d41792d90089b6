//! Component-level properties and scenarios

use std::collections::BTreeMap;

use adaptive_sizing::allocation::{
    is_normalized, ParticleFilterEnsemble, StrategyId, ThompsonStrategySelector,
};
use adaptive_sizing::config::{
    CalibrationConfig, HealthConfig, ParticleConfig, PidConfig, RegimeConfig, SizingConfig,
    ThompsonConfig, VolatilityConfig,
};
use adaptive_sizing::model::{SpectralRegimeDetector, VolatilityEstimator};
use adaptive_sizing::risk::{
    BetCalibrator, DrawdownState, HealthState, PidDrawdownController, PositionSizer,
    SystemHealthMonitor,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

fn ids(n: usize) -> Vec<StrategyId> {
    (0..n).map(|i| StrategyId::new(format!("strategy-{i}"))).collect()
}

fn thompson(seed: u64) -> ThompsonStrategySelector {
    ThompsonStrategySelector::new(&ThompsonConfig {
        seed: Some(seed),
        ..Default::default()
    })
    .unwrap()
}

fn particles(seed: u64, strategies: &[StrategyId]) -> ParticleFilterEnsemble {
    let config = ParticleConfig {
        seed: Some(seed),
        ..Default::default()
    };
    ParticleFilterEnsemble::with_strategies(&config, strategies).unwrap()
}

#[test]
fn test_sizer_and_pid_bounds() {
    let config = SizingConfig {
        max_size: 0.3,
        ..Default::default()
    };
    let sizer = PositionSizer::new(&config).unwrap();
    let mut estimator = VolatilityEstimator::new(&VolatilityConfig::default()).unwrap();
    let mut pid = PidDrawdownController::new(&PidConfig::default()).unwrap();
    let mut rng = StdRng::seed_from_u64(99);

    for _ in 0..2_000 {
        let vol = estimator.update(rng.gen_range(-0.05..0.05)).unwrap();
        let signal = rng.gen_range(-1e6..1e6);
        let confidence = rng.gen_range(-1.0..2.0);
        let size = sizer.size(signal, confidence, &vol);
        assert!(size.abs() <= 0.3, "size {size}");

        let multiplier = pid.update(rng.gen_range(0.0..1.0), rng.gen_range(0.0..0.2));
        assert!((0.0..=1.0).contains(&multiplier), "multiplier {multiplier}");
    }
}

#[test]
fn test_thompson_never_degenerates() {
    let ids = ids(4);
    let mut selector = thompson(5);
    let mut rng = StdRng::seed_from_u64(5);
    for step in 0..5_000 {
        // One strategy keeps losing, the others are silent most of the time
        selector.record_outcome(&ids[0], false, -1.0);
        if step % 97 == 0 {
            selector.record_outcome(&ids[rng.gen_range(1..4)], rng.gen_bool(0.5), 0.1);
        }
    }
    for record in selector.records().values() {
        assert!(record.wins >= 0.1);
        assert!(record.losses >= 0.1);
    }
    for _ in 0..100 {
        assert!(is_normalized(&selector.select_weights(&ids), false));
    }
}

#[test]
fn test_allocators_normalized() {
    let ids = ids(5);
    let mut selector = thompson(8);
    let mut ensemble = particles(8, &ids);
    let mut rng = StdRng::seed_from_u64(8);
    let noise = Normal::new(0.0, 2.0).unwrap();

    for _ in 0..500 {
        let pnls: BTreeMap<StrategyId, f64> =
            ids.iter().map(|id| (id.clone(), noise.sample(&mut rng))).collect();
        for (id, pnl) in &pnls {
            selector.record_pnl(id, *pnl);
        }
        ensemble.reweight(&pnls);
        ensemble.resample_if_needed();

        assert!(is_normalized(&selector.select_weights(&ids), false));
        let weights = ensemble.weights();
        assert_eq!(weights.len(), 5);
        assert!(is_normalized(&weights, false));
    }
}

#[test]
fn test_seeded_allocators_deterministic() {
    let ids = ids(3);
    let run = |seed: u64| {
        let mut selector = thompson(seed);
        let mut ensemble = particles(seed, &ids);
        let mut out = Vec::new();
        for step in 0..200 {
            let pnls: BTreeMap<StrategyId, f64> = ids
                .iter()
                .enumerate()
                .map(|(i, id)| (id.clone(), ((step * (i + 1)) as f64 * 0.7).sin()))
                .collect();
            for (id, pnl) in &pnls {
                selector.record_pnl(id, *pnl);
            }
            ensemble.reweight(&pnls);
            ensemble.resample_if_needed();
            out.push((selector.select_weights(&ids), ensemble.weights()));
        }
        out
    };
    assert_eq!(run(21), run(21));
}

#[test]
fn test_particle_overflow_resets_to_valid_population() {
    let ids = ids(2);
    let config = ParticleConfig {
        seed: Some(3),
        likelihood_scale: 10.0,
        ..Default::default()
    };
    let mut ensemble = ParticleFilterEnsemble::with_strategies(&config, &ids).unwrap();
    // Log-likelihood overflows to infinity for every particle
    let pnls: BTreeMap<StrategyId, f64> = ids.iter().map(|id| (id.clone(), f64::MAX)).collect();
    ensemble.reweight(&pnls);

    let weights = ensemble.weights();
    assert!(is_normalized(&weights, false));
    let ess = ensemble.effective_sample_size();
    assert!((ess - ensemble.len() as f64).abs() < 1e-6, "ess {ess}");
}

#[test]
fn test_new_ensemble_weights_uniform_over_no_evidence() {
    let ensemble = particles(4, &[]);
    assert!(ensemble.weights().is_empty());

    let single = particles(4, &ids(1));
    assert_eq!(single.weights()[&StrategyId::new("strategy-0")], 1.0);
}

#[test]
fn test_health_hysteresis_no_flapping() {
    let mut monitor = SystemHealthMonitor::new(&HealthConfig::default()).unwrap();
    // score = 0.6 + 0.4 * win_rate with no drawdown; upper threshold 0.7
    let mut transitions = 0;
    let mut previous = monitor.state();
    for step in 0..200 {
        let win_rate = if step % 2 == 0 { 0.24 } else { 0.26 };
        let state = monitor.update(100.0, 100.0, win_rate);
        if state != previous {
            transitions += 1;
            previous = state;
        }
    }
    assert_eq!(transitions, 1);
    assert_eq!(monitor.state(), HealthState::Cautious);

    // Clearing the threshold plus margin recovers
    assert_eq!(monitor.update(100.0, 100.0, 0.4), HealthState::Nominal);
}

#[test]
fn test_health_holds_through_drawdown_wobble() {
    let mut monitor = SystemHealthMonitor::new(&HealthConfig::default()).unwrap();
    let states: Vec<HealthState> = (0..10)
        .map(|i| monitor.update(if i % 2 == 0 { 90.0 } else { 90.1 }, 100.0, 0.9))
        .collect();
    assert!(states.iter().all(|s| *s == HealthState::Defensive), "{states:?}");

    // Recovery past the release level hands control back to the score
    assert_ne!(monitor.update(97.0, 100.0, 0.9), HealthState::Defensive);
}

#[test]
fn test_spectral_boundary() {
    let config = RegimeConfig::default();
    let mut detector = SpectralRegimeDetector::new(&config).unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    let noise = Normal::new(0.0, 0.01).unwrap();

    for _ in 1..config.min_samples {
        let classification = detector.observe(noise.sample(&mut rng));
        assert!(classification.is_unknown());
        assert_eq!(classification.confidence(), 0.0);
    }
    let classification = detector.observe(noise.sample(&mut rng));
    assert!(!classification.is_unknown());
}

#[test]
fn test_vol_shock_shrinks_size() {
    let mut estimator = VolatilityEstimator::new(&VolatilityConfig::default()).unwrap();
    let sizer = PositionSizer::new(&SizingConfig::default()).unwrap();

    let mut state = estimator.state();
    for i in 0..1_000 {
        state = estimator.update(if i % 2 == 0 { 0.01 } else { -0.01 }).unwrap();
    }
    let before = sizer.size(0.8, 0.7, &state);

    // Same alternating pattern with twice the variance
    let shocked = 0.01 * 2f64.sqrt();
    for i in 0..30 {
        state = estimator.update(if i % 2 == 0 { shocked } else { -shocked }).unwrap();
    }
    let after = sizer.size(0.8, 0.7, &state);

    assert!(state.vol_ratio() > 1.1);
    assert!(after < before, "before {before}, after {after}");
}

#[test]
fn test_drawdown_throttling() {
    let mut drawdown = DrawdownState::new(100.0);
    let mut pid = PidDrawdownController::new(&PidConfig::default()).unwrap();
    let target = 0.05;

    let mut last = 1.0;
    for equity in (80..=100).rev() {
        drawdown.update(equity as f64);
        let multiplier = pid.update(drawdown.drawdown_pct(), target);
        if drawdown.drawdown_pct() > target + 1e-9 {
            assert!(multiplier < last, "equity {equity}: {multiplier} !< {last}");
        } else {
            assert_eq!(multiplier, 1.0);
        }
        last = multiplier;
    }
    assert!(last < 0.8);

    for equity in 81..=100 {
        drawdown.update(equity as f64);
        let multiplier = pid.update(drawdown.drawdown_pct(), target);
        assert!(multiplier >= last, "equity {equity}: {multiplier} < {last}");
        last = multiplier;
    }
    assert_eq!(drawdown.drawdown_pct(), 0.0);
    assert_eq!(last, 1.0);
}

#[test]
fn test_unfitted_calibrator_is_monotone() {
    let calibrator = BetCalibrator::new(&CalibrationConfig::default()).unwrap();
    let mut last = 0.0;
    for i in 0..=100 {
        let bet = calibrator.calibrate(i as f64 / 100.0);
        assert!(bet >= last);
        assert!((0.0..=1.0).contains(&bet));
        last = bet;
    }
    assert_eq!(calibrator.calibrate(0.5), 0.0);
    assert_eq!(calibrator.calibrate(1.7), 1.0);
}
