//! PID drawdown control
//!
//! Closed-loop risk throttle: the error is `drawdown - target`, and the
//! control output `u` maps to a multiplier of `1 / (1 + u)` once positive.
//! Gains are fixed configuration; the controller does not auto-tune them.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PidConfig;
use crate::error::ControlError;
use crate::telemetry::{increment_counter, CounterMetric};

/// Controller internals after the latest update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidState {
    pub error: f64,
    pub integral: f64,
    pub derivative: f64,
    /// Risk multiplier in [0, 1]
    pub output: f64,
    pub steps: u64,
}

impl Default for PidState {
    fn default() -> Self {
        Self {
            error: 0.0,
            integral: 0.0,
            derivative: 0.0,
            output: 1.0,
            steps: 0,
        }
    }
}

/// Drawdown-driven PID risk multiplier
#[derive(Debug, Clone)]
pub struct PidDrawdownController {
    kp: f64,
    ki: f64,
    kd: f64,
    integral_limit: f64,
    prev_error: Option<f64>,
    state: PidState,
}

impl PidDrawdownController {
    /// Create a controller, validating gains and limits
    pub fn new(config: &PidConfig) -> Result<Self, ControlError> {
        config.validate()?;
        Ok(Self {
            kp: config.kp,
            ki: config.ki,
            kd: config.kd,
            integral_limit: config.integral_limit,
            prev_error: None,
            state: PidState::default(),
        })
    }

    /// Advance one step and return the risk multiplier in [0, 1]
    ///
    /// Non-finite inputs leave the controller untouched and repeat the last
    /// output.
    pub fn update(&mut self, drawdown_pct: f64, target_drawdown_pct: f64) -> f64 {
        if !drawdown_pct.is_finite() || !target_drawdown_pct.is_finite() {
            warn!(
                drawdown_pct,
                target_drawdown_pct, "Rejected non-finite PID input"
            );
            increment_counter(CounterMetric::RejectedInput);
            return self.state.output;
        }

        let error = drawdown_pct - target_drawdown_pct;
        let integral =
            (self.state.integral + error).clamp(-self.integral_limit, self.integral_limit);
        let derivative = self.prev_error.map_or(0.0, |prev| error - prev);

        let p = self.kp * error;
        let i = self.ki * integral;
        let d = self.kd * derivative;
        let u = p + i + d;

        // Below target the controller never amplifies risk
        let output = if u <= 0.0 {
            1.0
        } else {
            (1.0 / (1.0 + u)).clamp(0.0, 1.0)
        };

        debug!(drawdown_pct, error, p, i, d, output, "PID update");

        self.prev_error = Some(error);
        self.state = PidState {
            error,
            integral,
            derivative,
            output,
            steps: self.state.steps + 1,
        };
        output
    }

    pub fn state(&self) -> PidState {
        self.state
    }

    pub fn reset(&mut self) {
        self.prev_error = None;
        self.state = PidState::default();
    }
}
