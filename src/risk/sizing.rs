//! Position sizing
//!
//! Sign-preserving sizing (SOPS) with a sub-linear power-law transform:
//!
//! ```text
//! k    = clamp(k_base / (1 + vol_ratio), k_min, k_max)
//! size = max_size * tanh(k * sign(s) * |s|^p) * confidence
//! ```
//!
//! Large raw signals map to diminishing increments in size, and size shrinks
//! as realized volatility rises above its baseline.

use rust_decimal::prelude::*;
use tracing::{debug, warn};

use super::tape::TapeState;
use crate::config::SizingConfig;
use crate::error::ControlError;
use crate::model::VolatilityState;
use crate::telemetry::{increment_counter, CounterMetric};

/// Maps a raw signal and confidence into a bounded position fraction
#[derive(Debug, Clone)]
pub struct PositionSizer {
    config: SizingConfig,
}

impl PositionSizer {
    /// Create a sizer, validating the configuration
    pub fn new(config: &SizingConfig) -> Result<Self, ControlError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
        })
    }

    /// Largest absolute fraction this sizer returns
    pub fn max_size(&self) -> f64 {
        self.config.max_size
    }

    /// Volatility-adaptive tanh steepness
    pub fn k(&self, vol_state: &VolatilityState) -> f64 {
        if vol_state.baseline_at_floor() {
            return self.config.default_k;
        }
        let ratio = vol_state.vol_ratio();
        if !ratio.is_finite() {
            return self.config.k_min;
        }
        (self.config.k_base / (1.0 + ratio)).clamp(self.config.k_min, self.config.k_max)
    }

    /// Signed position fraction in [-max_size, max_size]
    ///
    /// Non-finite `signal` or `confidence` yields zero. Confidence is clamped
    /// into [0, 1].
    pub fn size(&self, signal: f64, confidence: f64, vol_state: &VolatilityState) -> f64 {
        self.size_scaled(signal, confidence, vol_state, 1.0)
    }

    /// Like [`PositionSizer::size`], weighted by trade arrival speed
    pub fn size_with_tape(
        &self,
        signal: f64,
        confidence: f64,
        vol_state: &VolatilityState,
        tape: &TapeState,
    ) -> f64 {
        self.size_scaled(signal, confidence, vol_state, tape.weight)
    }

    /// Convert a position fraction into an order notional
    pub fn notional(&self, fraction: f64, equity: Decimal) -> Decimal {
        let Some(fraction) = Decimal::from_f64(fraction) else {
            warn!(fraction, "Non-representable position fraction, notional is zero");
            return Decimal::ZERO;
        };
        (fraction * equity).round_dp(self.config.notional_dp)
    }

    fn size_scaled(
        &self,
        signal: f64,
        confidence: f64,
        vol_state: &VolatilityState,
        weight: f64,
    ) -> f64 {
        if !signal.is_finite() || !confidence.is_finite() || !weight.is_finite() {
            warn!(signal, confidence, weight, "Rejected non-finite sizing input");
            increment_counter(CounterMetric::RejectedInput);
            return 0.0;
        }

        let confidence = confidence.clamp(0.0, 1.0);
        let k = self.k(vol_state);
        let shaped = signal.signum() * signal.abs().powf(self.config.power);
        let max_size = self.config.max_size;
        let size = (max_size * (k * shaped).tanh() * confidence * weight.max(0.0))
            .clamp(-max_size, max_size);

        debug!(
            signal,
            confidence,
            k,
            vol_ratio = vol_state.vol_ratio(),
            size,
            "Position sized"
        );
        size
    }
}
