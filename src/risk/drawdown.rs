//! Drawdown tracking

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::telemetry::{increment_counter, CounterMetric};

/// Peak and current equity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownState {
    /// Highest equity seen since the last reset
    pub peak_equity: f64,
    /// Latest equity
    pub current_equity: f64,
}

impl DrawdownState {
    /// Create a tracker starting at `initial_equity`
    pub fn new(initial_equity: f64) -> Self {
        let equity = if initial_equity.is_finite() {
            initial_equity
        } else {
            0.0
        };
        Self {
            peak_equity: equity,
            current_equity: equity,
        }
    }

    /// Update with new equity value
    ///
    /// Non-finite equity is ignored.
    pub fn update(&mut self, equity: f64) {
        if !equity.is_finite() {
            warn!(equity, "Ignoring non-finite equity");
            increment_counter(CounterMetric::RejectedInput);
            return;
        }
        self.current_equity = equity;
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
    }

    /// Fractional drawdown from peak, zero while the peak is not positive
    pub fn drawdown_pct(&self) -> f64 {
        if self.peak_equity <= 0.0 {
            return 0.0;
        }
        ((self.peak_equity - self.current_equity) / self.peak_equity).max(0.0)
    }

    /// Restart tracking from the current equity
    pub fn reset(&mut self) {
        self.peak_equity = self.current_equity;
    }
}

impl Default for DrawdownState {
    fn default() -> Self {
        Self::new(0.0)
    }
}
