//! Tape speed estimation
//!
//! Models trade arrivals as a Poisson process and tracks the arrival rate
//! (lambda) relative to its own recent median.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SizingConfig;
use crate::model::IirLowPass;

/// Rates kept for the median baseline
const BASELINE_WINDOW: usize = 100;
/// Rates needed before the median baseline replaces the prior
const BASELINE_MIN_SAMPLES: usize = 20;
/// Intervals shorter than this (seconds) are ignored
const MIN_INTERVAL_SECS: f64 = 1e-10;

/// Arrival-rate regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TapeRegime {
    Fast,
    Normal,
    Slow,
}

/// Snapshot of the tape speed estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TapeState {
    /// Smoothed arrivals per second
    pub lambda_rate: f64,
    /// Rate over baseline, clamped to [0, 2]
    pub normalized_speed: f64,
    pub regime: TapeRegime,
    /// Sizing weight, sqrt of the normalized speed
    pub weight: f64,
}

/// Poisson arrival-rate estimator
pub struct TapeSpeed {
    rate: IirLowPass,
    prior_rate: f64,
    fast_ratio: f64,
    slow_ratio: f64,
    last_timestamp: Option<DateTime<Utc>>,
    history: VecDeque<f64>,
    baseline: Option<f64>,
}

impl TapeSpeed {
    /// Create an estimator with a prior of one arrival per second
    pub fn new(config: &SizingConfig) -> Self {
        Self::with_prior(config, 1.0)
    }

    /// Create an estimator with an explicit prior arrival rate
    pub fn with_prior(config: &SizingConfig, prior_rate: f64) -> Self {
        Self {
            rate: IirLowPass::new(config.tape_alpha),
            prior_rate,
            fast_ratio: config.tape_fast_ratio,
            slow_ratio: config.tape_slow_ratio,
            last_timestamp: None,
            history: VecDeque::with_capacity(BASELINE_WINDOW),
            baseline: None,
        }
    }

    /// Record `count` arrivals at `timestamp`
    pub fn update(&mut self, timestamp: DateTime<Utc>, count: u32) -> TapeState {
        if let Some(last) = self.last_timestamp {
            let interval = (timestamp - last)
                .num_microseconds()
                .map_or(f64::INFINITY, |us| us as f64 / 1e6);
            if interval > MIN_INTERVAL_SECS && interval.is_finite() {
                let smoothed = self.rate.update(count as f64 / interval);
                self.push_history(smoothed);
            }
        }
        self.last_timestamp = Some(timestamp);
        self.state()
    }

    pub fn state(&self) -> TapeState {
        let lambda_rate = self.rate.value().unwrap_or(self.prior_rate);
        let baseline = self.baseline.unwrap_or(self.prior_rate);
        let ratio = if baseline > MIN_INTERVAL_SECS {
            lambda_rate / baseline
        } else {
            1.0
        };
        let normalized_speed = ratio.clamp(0.0, 2.0);

        let regime = if ratio > self.fast_ratio {
            TapeRegime::Fast
        } else if ratio < self.slow_ratio {
            TapeRegime::Slow
        } else {
            TapeRegime::Normal
        };

        TapeState {
            lambda_rate,
            normalized_speed,
            regime,
            weight: normalized_speed.sqrt(),
        }
    }

    pub fn reset(&mut self) {
        self.rate.reset();
        self.last_timestamp = None;
        self.history.clear();
        self.baseline = None;
    }

    fn push_history(&mut self, rate: f64) {
        if self.history.len() == BASELINE_WINDOW {
            self.history.pop_front();
        }
        self.history.push_back(rate);

        if self.history.len() >= BASELINE_MIN_SAMPLES {
            let mut sorted: Vec<f64> = self.history.iter().copied().collect();
            sorted.sort_by(f64::total_cmp);
            self.baseline = Some(sorted[sorted.len() / 2]);
        }
    }
}
