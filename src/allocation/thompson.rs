//! Thompson sampling over strategies
//!
//! Each strategy carries a Beta(wins, losses) posterior. Every update adds the
//! new outcomes, then applies exponential forgetting to all strategies and
//! floors both parameters so the posterior never degenerates.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Beta, Distribution};
use tracing::{debug, warn};

use super::record::{StrategyId, StrategyPerformanceRecord};
use super::weights::{normalize_weights, uniform_weights, StrategyWeights};
use crate::config::ThompsonConfig;
use crate::error::ControlError;
use crate::telemetry::{increment_counter, CounterMetric};

/// Bayesian bandit producing allocation weights
pub struct ThompsonStrategySelector {
    config: ThompsonConfig,
    records: BTreeMap<StrategyId, StrategyPerformanceRecord>,
    rng: StdRng,
}

impl ThompsonStrategySelector {
    /// Create a selector, seeding from configuration when a seed is given
    pub fn new(config: &ThompsonConfig) -> Result<Self, ControlError> {
        config.validate()?;
        Ok(Self {
            rng: config
                .seed
                .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64),
            config: config.clone(),
            records: BTreeMap::new(),
        })
    }

    /// Track a strategy before its first outcome
    pub fn register(&mut self, id: &StrategyId) {
        if !self.records.contains_key(id) {
            self.records.insert(id.clone(), self.prior_record());
        }
    }

    /// Record a single outcome, then decay every posterior once
    pub fn record_outcome(&mut self, id: &StrategyId, win: bool, pnl: f64) {
        self.record_batch([(id.clone(), win, pnl)]);
    }

    /// Record an outcome derived from realized PnL
    ///
    /// A PnL of exactly zero carries no win/loss information and is skipped.
    /// Returns whether an outcome was recorded.
    pub fn record_pnl(&mut self, id: &StrategyId, pnl: f64) -> bool {
        if !pnl.is_finite() || pnl == 0.0 {
            return false;
        }
        self.record_outcome(id, pnl > 0.0, pnl);
        true
    }

    /// Record every outcome of one tick, then decay every posterior once
    pub fn record_batch(&mut self, outcomes: impl IntoIterator<Item = (StrategyId, bool, f64)>) {
        for (id, win, pnl) in outcomes {
            let prior = self.prior_record();
            self.records.entry(id).or_insert(prior).record(win, pnl);
        }
        self.decay();
    }

    /// Apply the forgetting factor and floor to every strategy
    pub fn decay(&mut self) {
        for record in self.records.values_mut() {
            record.decay(self.config.decay, self.config.floor);
        }
    }

    /// Sample one allocation per strategy and normalize to sum to one
    ///
    /// Unknown ids are sampled from the prior without being tracked. Falls
    /// back to uniform weights when every sample is zero.
    pub fn select_weights(&mut self, strategy_ids: &[StrategyId]) -> StrategyWeights {
        let mut weights = StrategyWeights::new();
        for id in strategy_ids {
            let (alpha, beta) = self
                .records
                .get(id)
                .map_or((self.config.prior_alpha, self.config.prior_beta), |r| {
                    (r.wins, r.losses)
                });
            let sample = match self.sample(alpha, beta) {
                Ok(sample) => sample,
                Err(err) => {
                    warn!(strategy = %id, error = %err, "Beta sampling failed, using posterior mean");
                    alpha / (alpha + beta)
                }
            };
            weights.insert(id.clone(), sample);
        }

        if !weights.is_empty() && !normalize_weights(&mut weights) {
            debug!("All Thompson samples were zero, using uniform weights");
            return uniform_weights(strategy_ids);
        }
        weights
    }

    pub fn record(&self, id: &StrategyId) -> Option<&StrategyPerformanceRecord> {
        self.records.get(id)
    }

    pub fn records(&self) -> &BTreeMap<StrategyId, StrategyPerformanceRecord> {
        &self.records
    }

    /// Posterior mean for a strategy, prior mean when unknown
    pub fn posterior_mean(&self, id: &StrategyId) -> f64 {
        self.records.get(id).map_or_else(
            || self.config.prior_alpha / (self.config.prior_alpha + self.config.prior_beta),
            StrategyPerformanceRecord::mean,
        )
    }

    /// Forget all evidence, keeping tracked strategies at their prior
    pub fn reset(&mut self) {
        for record in self.records.values_mut() {
            *record = StrategyPerformanceRecord::new(
                self.config.prior_alpha,
                self.config.prior_beta,
                self.config.pnl_window,
            );
        }
    }

    fn prior_record(&self) -> StrategyPerformanceRecord {
        StrategyPerformanceRecord::new(
            self.config.prior_alpha,
            self.config.prior_beta,
            self.config.pnl_window,
        )
    }

    fn sample(&mut self, alpha: f64, beta: f64) -> Result<f64, ControlError> {
        let distribution = Beta::new(alpha, beta).map_err(|e| {
            increment_counter(CounterMetric::ConservativeFallback);
            ControlError::degenerate("thompson", format!("Beta({alpha}, {beta}): {e}"))
        })?;
        let sample = distribution.sample(&mut self.rng);
        if sample.is_finite() {
            Ok(sample)
        } else {
            Err(ControlError::degenerate("thompson", "non-finite Beta sample"))
        }
    }
}
