//! Meta controller
//!
//! Owns every control component and composes them once per tick, in a fixed
//! order:
//!
//! 1. volatility and spectral regime from the market return
//! 2. drawdown and health from equity (win rate from previous outcomes)
//! 3. Thompson posteriors and particle weights from strategy PnL
//! 4. PID risk multiplier from drawdown
//! 5. blend: `lambda * thompson + (1 - lambda) * particle`, lambda per health
//!    state, then scaled by regime affinity and renormalized
//! 6. defensive override: strategies without a track record get zero weight
//!
//! Any failure inside a tick is contained here and answered with the
//! conservative output.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::types::{ControllerOutput, MarketHarmony, RegimeAffinity};
use crate::allocation::{
    is_normalized, normalize_weights, uniform_weights, ParticleFilterEnsemble, StrategyId,
    StrategyPerformanceRecord, StrategyWeights, ThompsonStrategySelector,
};
use crate::config::Config;
use crate::error::ControlError;
use crate::model::{
    MarketRegime, RegimeClassification, SpectralRegimeDetector, VolatilityEstimator,
    VolatilityState,
};
use crate::risk::{DrawdownState, HealthState, PidDrawdownController, SystemHealthMonitor};
use crate::telemetry::{increment_counter, set_gauge, CounterMetric, GaugeMetric};

/// Win rate assumed before any outcome has been recorded
const NEUTRAL_WIN_RATE: f64 = 0.5;

/// Top-level orchestrator for one risk-budget scope
pub struct MetaController {
    config: Config,
    volatility: VolatilityEstimator,
    regime: SpectralRegimeDetector,
    drawdown: DrawdownState,
    health: SystemHealthMonitor,
    pid: PidDrawdownController,
    thompson: ThompsonStrategySelector,
    particles: ParticleFilterEnsemble,
    affinities: BTreeMap<StrategyId, RegimeAffinity>,
    last_regime: MarketRegime,
    tick: u64,
}

impl MetaController {
    /// Build every component eagerly, failing on invalid configuration
    pub fn new(config: &Config) -> Result<Self, ControlError> {
        config.validate()?;
        Ok(Self {
            volatility: VolatilityEstimator::new(&config.volatility)?,
            regime: SpectralRegimeDetector::new(&config.regime)?,
            drawdown: DrawdownState::default(),
            health: SystemHealthMonitor::new(&config.health)?,
            pid: PidDrawdownController::new(&config.pid)?,
            thompson: ThompsonStrategySelector::new(&config.thompson)?,
            particles: ParticleFilterEnsemble::new(&config.particle)?,
            affinities: BTreeMap::new(),
            last_regime: MarketRegime::Unknown,
            tick: 0,
            config: config.clone(),
        })
    }

    /// Register a strategy with its regime affinity
    ///
    /// Re-registering replaces the affinity and keeps the history.
    pub fn register_strategy(
        &mut self,
        id: impl Into<StrategyId>,
        affinity: RegimeAffinity,
    ) -> Result<(), ControlError> {
        affinity.validate()?;
        let id = id.into();
        self.thompson.register(&id);
        self.particles.add_strategy(&id);
        info!(strategy = %id, ?affinity, "Registered strategy");
        self.affinities.insert(id, affinity);
        Ok(())
    }

    /// Registered strategies in id order
    pub fn strategies(&self) -> impl Iterator<Item = &StrategyId> {
        self.affinities.keys()
    }

    /// Performance evidence for one strategy
    pub fn performance(&self, id: &StrategyId) -> Option<&StrategyPerformanceRecord> {
        self.thompson.record(id)
    }

    pub fn health_state(&self) -> HealthState {
        self.health.state()
    }

    pub fn regime(&self) -> RegimeClassification {
        self.regime.current()
    }

    pub fn volatility_state(&self) -> VolatilityState {
        self.volatility.state()
    }

    pub fn drawdown(&self) -> DrawdownState {
        self.drawdown
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process one tick and return the controller snapshot
    ///
    /// Never fails: internal errors and panics produce the conservative
    /// output (zero risk, uniform weights).
    pub fn tick(
        &mut self,
        market_return: f64,
        equity: f64,
        strategy_pnls: &BTreeMap<StrategyId, f64>,
    ) -> ControllerOutput {
        self.contained(|this| this.try_tick(market_return, equity, strategy_pnls))
    }

    /// Run one tick body, turning errors and panics into the conservative output
    fn contained(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<ControllerOutput, ControlError>,
    ) -> ControllerOutput {
        self.tick += 1;
        let tick = self.tick;

        let result = panic::catch_unwind(AssertUnwindSafe(|| body(&mut *self)));
        let failure = match result {
            Ok(Ok(output)) => return output,
            Ok(Err(err)) => err,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                ControlError::upstream("meta_controller", reason)
            }
        };

        error!(tick, error = %failure, "Tick failed, emitting conservative output");
        increment_counter(CounterMetric::ConservativeFallback);
        self.health.force(HealthState::Defensive);
        let output =
            ControllerOutput::conservative(tick, self.affinities.keys(), self.drawdown.drawdown_pct());
        publish_gauges(&output, self.particles.effective_sample_size());
        output
    }

    /// Return every component to its start-up state, keeping registrations
    pub fn reset(&mut self) {
        self.volatility.reset();
        self.regime.reset();
        self.drawdown = DrawdownState::default();
        self.health.reset();
        self.pid.reset();
        self.thompson.reset();
        self.particles.reset();
        self.last_regime = MarketRegime::Unknown;
        self.tick = 0;
        info!(strategies = self.affinities.len(), "Meta controller reset");
    }

    fn try_tick(
        &mut self,
        market_return: f64,
        equity: f64,
        strategy_pnls: &BTreeMap<StrategyId, f64>,
    ) -> Result<ControllerOutput, ControlError> {
        // 1. Volatility and regime
        let vol_state = match self.volatility.update(market_return) {
            Ok(state) => state,
            Err(ControlError::InvalidInput { .. }) => self.volatility.state(),
            Err(err) => return Err(err),
        };
        let regime = self.regime.observe(market_return);
        if regime.regime() != self.last_regime {
            info!(
                from = %self.last_regime,
                to = %regime.regime(),
                alpha = regime.alpha(),
                confidence = regime.confidence(),
                "Regime changed"
            );
            self.last_regime = regime.regime();
        }

        // 2. Drawdown and health
        self.drawdown.update(equity);
        let drawdown_pct = self.drawdown.drawdown_pct();
        let win_rate = self.recent_win_rate();
        let health = self.health.update(
            self.drawdown.current_equity,
            self.drawdown.peak_equity,
            win_rate,
        );

        // 3. Strategy evidence
        self.record_strategy_pnls(strategy_pnls);

        // 4. PID
        let pid_multiplier = self
            .pid
            .update(drawdown_pct, self.config.pid.target_drawdown_pct);

        // 5. Blend
        let ids: Vec<StrategyId> = self.affinities.keys().cloned().collect();
        let mut weights = self.blend(&ids, health, regime.regime());

        // 6. Defensive override
        if health == HealthState::Defensive {
            self.apply_defensive_override(&mut weights);
        }

        let harmony = self.harmony();
        let health_factor = match health {
            HealthState::Nominal => 1.0,
            HealthState::Cautious => self.config.controller.cautious_risk_factor,
            HealthState::Defensive => self.config.controller.defensive_risk_factor,
        };
        let risk_multiplier =
            (pid_multiplier * health_factor * harmony.risk_factor(&self.config.controller))
                .clamp(0.0, 1.0);

        let output = ControllerOutput {
            tick: self.tick,
            timestamp: Utc::now(),
            risk_multiplier,
            strategy_weights: weights,
            health_state: health,
            regime_classification: regime,
            harmony,
            drawdown_pct,
            vol_ratio: vol_state.vol_ratio(),
            degraded: false,
        };
        validate_output(&output)?;

        debug!(
            tick = output.tick,
            risk_multiplier,
            pid_multiplier,
            health = %health,
            regime = %regime.regime(),
            harmony = %harmony,
            drawdown_pct,
            "Tick complete"
        );
        publish_gauges(&output, self.particles.effective_sample_size());
        Ok(output)
    }

    /// Feed one tick of PnL to both allocators, registering new strategies
    fn record_strategy_pnls(&mut self, strategy_pnls: &BTreeMap<StrategyId, f64>) {
        let mut finite = BTreeMap::new();
        for (id, &pnl) in strategy_pnls {
            if !self.affinities.contains_key(id) {
                info!(strategy = %id, "New strategy seen in PnL, registering with default affinity");
                self.thompson.register(id);
                self.particles.add_strategy(id);
                self.affinities.insert(id.clone(), RegimeAffinity::default());
            }
            if pnl.is_finite() {
                finite.insert(id.clone(), pnl);
            } else {
                warn!(strategy = %id, pnl, "Ignoring non-finite strategy PnL");
                increment_counter(CounterMetric::RejectedInput);
            }
        }

        let outcomes: Vec<(StrategyId, bool, f64)> = finite
            .iter()
            .filter(|(_, pnl)| **pnl != 0.0)
            .map(|(id, pnl)| (id.clone(), *pnl > 0.0, *pnl))
            .collect();
        self.thompson.record_batch(outcomes);

        self.particles.reweight(&finite);
        self.particles.resample_if_needed();
    }

    fn blend(
        &mut self,
        ids: &[StrategyId],
        health: HealthState,
        regime: MarketRegime,
    ) -> StrategyWeights {
        if ids.is_empty() {
            return StrategyWeights::new();
        }

        let lambda = match health {
            HealthState::Nominal => self.config.controller.blend_nominal,
            HealthState::Cautious => self.config.controller.blend_cautious,
            HealthState::Defensive => self.config.controller.blend_defensive,
        };
        let thompson = self.thompson.select_weights(ids);
        let particle = self.particles.weights();

        let blended: StrategyWeights = ids
            .iter()
            .map(|id| {
                let t = thompson.get(id).copied().unwrap_or(0.0);
                let p = particle.get(id).copied().unwrap_or(0.0);
                (id.clone(), lambda * t + (1.0 - lambda) * p)
            })
            .collect();

        let mut weighted: StrategyWeights = blended
            .iter()
            .map(|(id, w)| {
                let affinity = self
                    .affinities
                    .get(id)
                    .map_or(1.0, |a| a.for_regime(regime));
                (id.clone(), w * affinity)
            })
            .collect();

        if normalize_weights(&mut weighted) {
            return weighted;
        }
        debug!(regime = %regime, "Affinity removed all weight, using unadjusted blend");
        let mut blended = blended;
        if normalize_weights(&mut blended) {
            blended
        } else {
            uniform_weights(ids)
        }
    }

    /// Zero strategies without enough history and renormalize the rest
    fn apply_defensive_override(&self, weights: &mut StrategyWeights) {
        let min_track_record = self.config.controller.min_track_record;
        for (id, weight) in weights.iter_mut() {
            let observations = self.thompson.record(id).map_or(0, |r| r.observations);
            if observations < min_track_record {
                *weight = 0.0;
            }
        }
        if !normalize_weights(weights) {
            weights.values_mut().for_each(|w| *w = 0.0);
        }
    }

    /// Share of winning outcomes across every strategy's recent PnL
    fn recent_win_rate(&self) -> f64 {
        let (wins, losses) = self
            .thompson
            .records()
            .values()
            .map(StrategyPerformanceRecord::recent_counts)
            .fold((0, 0), |(w, l), (rw, rl)| (w + rw, l + rl));
        if wins + losses == 0 {
            NEUTRAL_WIN_RATE
        } else {
            wins as f64 / (wins + losses) as f64
        }
    }

    fn harmony(&self) -> MarketHarmony {
        let lookback = self.config.controller.harmony_lookback;
        let records = self.thompson.records();
        if records.values().all(|r| r.recent_pnl.is_empty()) {
            return MarketHarmony::Consonant;
        }

        let total: f64 = records.values().map(|r| r.recent_pnl_sum(lookback)).sum();
        let loss_limit =
            (self.drawdown.current_equity * self.config.controller.harmony_loss_fraction).abs();
        if total > 0.0 {
            MarketHarmony::Consonant
        } else if total < -loss_limit {
            MarketHarmony::Dissonant
        } else {
            MarketHarmony::Resolving
        }
    }
}

/// Reject outputs that break the snapshot invariants
fn validate_output(output: &ControllerOutput) -> Result<(), ControlError> {
    if !(0.0..=1.0).contains(&output.risk_multiplier) {
        return Err(ControlError::upstream(
            "meta_controller",
            format!("risk multiplier {} outside [0, 1]", output.risk_multiplier),
        ));
    }
    let allow_zero = output.health_state == HealthState::Defensive;
    if !output.strategy_weights.is_empty() && !is_normalized(&output.strategy_weights, allow_zero)
    {
        return Err(ControlError::upstream(
            "meta_controller",
            "strategy weights are not normalized",
        ));
    }
    Ok(())
}

fn publish_gauges(output: &ControllerOutput, ess: f64) {
    set_gauge(GaugeMetric::RiskMultiplier, output.risk_multiplier);
    set_gauge(GaugeMetric::DrawdownPct, output.drawdown_pct);
    set_gauge(GaugeMetric::VolRatio, output.vol_ratio);
    set_gauge(GaugeMetric::SpectralAlpha, output.regime_classification.alpha());
    set_gauge(GaugeMetric::HealthState, output.health_state.code());
    set_gauge(GaugeMetric::EffectiveSampleSize, ess);
    set_gauge(GaugeMetric::StrategyCount, output.strategy_weights.len() as f64);
}
