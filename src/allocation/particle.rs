//! Particle filter over strategy weight vectors
//!
//! Each particle is a hypothesis about the right allocation. A particle's
//! log-importance weight grows with the PnL its allocation would have earned:
//!
//! ```text
//! log_w += scale * sum_s(w_s * pnl_s)
//! ```
//!
//! When the effective sample size falls below `resample_threshold * N` the
//! population is systematically resampled and jittered to keep diversity.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::{debug, warn};

use super::record::StrategyId;
use super::weights::{normalize_slice, uniform_weights, StrategyWeights};
use crate::config::ParticleConfig;
use crate::error::ControlError;
use crate::telemetry::{increment_counter, CounterMetric};

#[derive(Debug, Clone)]
struct Particle {
    /// Allocation aligned with `ParticleFilterEnsemble::strategies`
    weights: Vec<f64>,
    log_weight: f64,
}

/// Weighted population of allocation hypotheses
pub struct ParticleFilterEnsemble {
    config: ParticleConfig,
    strategies: Vec<StrategyId>,
    particles: Vec<Particle>,
    rng: StdRng,
}

impl ParticleFilterEnsemble {
    /// Create an empty ensemble, seeding from configuration when given
    pub fn new(config: &ParticleConfig) -> Result<Self, ControlError> {
        config.validate()?;
        let particles = (0..config.particles)
            .map(|_| Particle {
                weights: Vec::new(),
                log_weight: 0.0,
            })
            .collect();
        Ok(Self {
            rng: config
                .seed
                .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64),
            config: config.clone(),
            strategies: Vec::new(),
            particles,
        })
    }

    /// Create an ensemble over an initial strategy set
    pub fn with_strategies(
        config: &ParticleConfig,
        strategies: &[StrategyId],
    ) -> Result<Self, ControlError> {
        let mut ensemble = Self::new(config)?;
        for id in strategies {
            ensemble.add_strategy(id);
        }
        Ok(ensemble)
    }

    /// Add a strategy to every particle; returns false if already present
    pub fn add_strategy(&mut self, id: &StrategyId) -> bool {
        if self.strategies.contains(id) {
            return false;
        }
        self.strategies.push(id.clone());
        for particle in &mut self.particles {
            particle.weights.push(self.rng.gen::<f64>());
            normalize_slice(&mut particle.weights);
        }
        true
    }

    /// Strategies in particle vector order
    pub fn strategies(&self) -> &[StrategyId] {
        &self.strategies
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Update importance weights with one tick of realized PnL
    ///
    /// Unknown strategies are added first. Non-finite PnL counts as zero.
    pub fn reweight(&mut self, strategy_pnls: &BTreeMap<StrategyId, f64>) {
        for id in strategy_pnls.keys() {
            self.add_strategy(id);
        }

        let pnls: Vec<f64> = self
            .strategies
            .iter()
            .map(|id| match strategy_pnls.get(id) {
                Some(pnl) if pnl.is_finite() => *pnl,
                Some(pnl) => {
                    warn!(strategy = %id, pnl, "Ignoring non-finite strategy PnL");
                    increment_counter(CounterMetric::RejectedInput);
                    0.0
                }
                None => 0.0,
            })
            .collect();

        let scale = self.config.likelihood_scale;
        for particle in &mut self.particles {
            let portfolio: f64 = particle
                .weights
                .iter()
                .zip(&pnls)
                .map(|(w, pnl)| w * pnl)
                .sum();
            particle.log_weight += scale * portfolio;
        }

        let max = self
            .particles
            .iter()
            .map(|p| p.log_weight)
            .fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() || self.particles.iter().any(|p| p.log_weight.is_nan()) {
            self.reset_degenerate("non-finite log weights after reweight");
            return;
        }
        for particle in &mut self.particles {
            particle.log_weight -= max;
        }
    }

    /// Consensus allocation: importance-weighted mean of particle vectors
    ///
    /// Falls back to uniform over the tracked strategies when every
    /// importance weight underflows.
    pub fn weights(&self) -> StrategyWeights {
        if self.strategies.is_empty() {
            return StrategyWeights::new();
        }
        let Some(importance) = self.importance() else {
            debug!("Particle importance weights underflowed, using uniform weights");
            return uniform_weights(&self.strategies);
        };

        let mut consensus = vec![0.0; self.strategies.len()];
        for (particle, w) in self.particles.iter().zip(&importance) {
            for (c, value) in consensus.iter_mut().zip(&particle.weights) {
                *c += w * value;
            }
        }
        normalize_slice(&mut consensus);
        self.strategies.iter().cloned().zip(consensus).collect()
    }

    /// Importance-weighted spread of each strategy's weight across particles
    pub fn uncertainty(&self) -> StrategyWeights {
        let consensus = self.weights();
        let importance = self
            .importance()
            .unwrap_or_else(|| vec![1.0 / self.particles.len() as f64; self.particles.len()]);

        self.strategies
            .iter()
            .enumerate()
            .map(|(s, id)| {
                let mean = consensus.get(id).copied().unwrap_or(0.0);
                let variance: f64 = self
                    .particles
                    .iter()
                    .zip(&importance)
                    .map(|(p, w)| w * (p.weights[s] - mean).powi(2))
                    .sum();
                (id.clone(), variance.sqrt())
            })
            .collect()
    }

    /// 1 / sum of squared normalized importance weights; zero on underflow
    pub fn effective_sample_size(&self) -> f64 {
        match self.importance() {
            Some(importance) => {
                let sum_sq: f64 = importance.iter().map(|w| w * w).sum();
                if sum_sq > 0.0 {
                    1.0 / sum_sq
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }

    /// Resample when the effective sample size is too low
    ///
    /// A zero effective sample size resets the population. Returns whether the
    /// population changed.
    pub fn resample_if_needed(&mut self) -> bool {
        let ess = self.effective_sample_size();
        if ess <= 0.0 || !ess.is_finite() {
            self.reset_degenerate("effective sample size is zero");
            return true;
        }

        let n = self.particles.len() as f64;
        if ess >= self.config.resample_threshold * n {
            return false;
        }
        let Some(importance) = self.importance() else {
            self.reset_degenerate("importance weights underflowed");
            return true;
        };

        debug!(ess, particles = self.particles.len(), "Resampling particles");
        self.systematic_resample(&importance);
        self.jitter();
        true
    }

    /// Fresh random population with equal importance
    pub fn reset(&mut self) {
        let k = self.strategies.len();
        for particle in &mut self.particles {
            particle.weights = (0..k).map(|_| self.rng.gen::<f64>()).collect();
            normalize_slice(&mut particle.weights);
            particle.log_weight = 0.0;
        }
    }

    /// Normalized importance weights, None when all underflow
    fn importance(&self) -> Option<Vec<f64>> {
        let raw: Vec<f64> = self.particles.iter().map(|p| p.log_weight.exp()).collect();
        let total: f64 = raw.iter().sum();
        if !(total.is_finite() && total > 0.0) {
            return None;
        }
        Some(raw.into_iter().map(|w| w / total).collect())
    }

    fn systematic_resample(&mut self, importance: &[f64]) {
        let n = self.particles.len();
        let start = self.rng.gen::<f64>() / n as f64;

        let mut resampled = Vec::with_capacity(n);
        let mut cumulative = importance.first().copied().unwrap_or(0.0);
        let mut j = 0;
        for i in 0..n {
            let position = start + i as f64 / n as f64;
            while position > cumulative && j + 1 < n {
                j += 1;
                cumulative += importance[j];
            }
            resampled.push(Particle {
                weights: self.particles[j].weights.clone(),
                log_weight: 0.0,
            });
        }
        self.particles = resampled;
    }

    fn jitter(&mut self) {
        if self.config.jitter_std <= 0.0 {
            return;
        }
        let Ok(noise) = Normal::new(0.0, self.config.jitter_std) else {
            return;
        };
        for particle in &mut self.particles {
            for w in particle.weights.iter_mut() {
                *w = (*w + noise.sample(&mut self.rng)).max(0.0);
            }
            normalize_slice(&mut particle.weights);
        }
    }

    fn reset_degenerate(&mut self, reason: &str) {
        warn!(reason, "Particle population degenerate, resetting to uniform prior");
        increment_counter(CounterMetric::ParticleReset);
        self.reset();
    }
}
