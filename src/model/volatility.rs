//! Volatility estimation module
//!
//! Dual-EMA variance of a return stream: a fast "current" estimate and a slow
//! baseline used as the denominator of the volatility ratio.

use tracing::warn;

use super::filters::RecursiveVariance;
use super::types::VolatilityState;
use crate::config::VolatilityConfig;
use crate::error::{ensure_finite, ControlError};
use crate::telemetry::{increment_counter, CounterMetric};

/// Exponential volatility estimator over returns or signals
pub struct VolatilityEstimator {
    fast: RecursiveVariance,
    slow: RecursiveVariance,
    variance_floor: f64,
    state: VolatilityState,
}

impl VolatilityEstimator {
    /// Create a new estimator, validating the configuration
    pub fn new(config: &VolatilityConfig) -> Result<Self, ControlError> {
        config.validate()?;
        Ok(Self {
            fast: RecursiveVariance::new(config.fast_alpha),
            slow: RecursiveVariance::new(config.slow_alpha),
            variance_floor: config.variance_floor,
            state: VolatilityState::empty(config.variance_floor),
        })
    }

    /// Add a new observation
    ///
    /// Non-finite input is rejected and leaves the state untouched; the
    /// previous state stays available through [`VolatilityEstimator::state`].
    pub fn update(&mut self, return_value: f64) -> Result<VolatilityState, ControlError> {
        if let Err(err) = ensure_finite("return_value", return_value) {
            warn!(value = return_value, "Rejected non-finite volatility input");
            increment_counter(CounterMetric::RejectedInput);
            return Err(err);
        }

        let fast_variance = self.fast.update(return_value);
        let slow_variance = self.slow.update(return_value);

        self.state = VolatilityState {
            ema_value: self.fast.mean(),
            ema_variance: fast_variance,
            baseline_variance: slow_variance.max(self.variance_floor),
            sample_count: self.state.sample_count + 1,
            variance_floor: self.variance_floor,
        };
        Ok(self.state)
    }

    /// Latest accepted state
    pub fn state(&self) -> VolatilityState {
        self.state
    }

    /// Fast over baseline volatility
    pub fn vol_ratio(&self) -> f64 {
        self.state.vol_ratio()
    }

    pub fn reset(&mut self) {
        self.fast.reset();
        self.slow.reset();
        self.state = VolatilityState::empty(self.variance_floor);
    }
}
