//! System health state machine
//!
//! A composite score in [0, 1] mixes drawdown headroom with recent win rate:
//!
//! ```text
//! score = w_dd * (1 - min(dd / dd_scale, 1)) + (1 - w_dd) * win_rate
//! ```
//!
//! Moving down a state happens as soon as the score drops below a threshold.
//! Moving back up needs the score to clear that threshold plus the
//! hysteresis margin, so a score hovering at a boundary does not flap.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::HealthConfig;
use crate::error::ControlError;
use crate::telemetry::{increment_counter, CounterMetric};

/// Discrete health of the trading system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Nominal,
    Cautious,
    Defensive,
}

impl HealthState {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthState::Nominal => "nominal",
            HealthState::Cautious => "cautious",
            HealthState::Defensive => "defensive",
        }
    }

    /// Numeric code for gauges: 0 nominal, 1 cautious, 2 defensive
    pub fn code(self) -> f64 {
        match self {
            HealthState::Nominal => 0.0,
            HealthState::Cautious => 1.0,
            HealthState::Defensive => 2.0,
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hysteretic health classifier
#[derive(Debug, Clone)]
pub struct SystemHealthMonitor {
    config: HealthConfig,
    state: HealthState,
    score: f64,
    drawdown_pct: f64,
    halted: bool,
}

impl SystemHealthMonitor {
    /// Create a monitor in the Nominal state
    pub fn new(config: &HealthConfig) -> Result<Self, ControlError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            state: HealthState::Nominal,
            score: 1.0,
            drawdown_pct: 0.0,
            halted: false,
        })
    }

    /// Update with equity and recent win rate, returning the new state
    pub fn update(
        &mut self,
        current_equity: f64,
        peak_equity: f64,
        recent_win_rate: f64,
    ) -> HealthState {
        if !current_equity.is_finite() || !peak_equity.is_finite() || recent_win_rate.is_nan() {
            warn!(
                current_equity,
                peak_equity, recent_win_rate, "Rejected non-finite health input"
            );
            increment_counter(CounterMetric::RejectedInput);
            return self.state;
        }

        let win_rate = if (0.0..=1.0).contains(&recent_win_rate) {
            recent_win_rate
        } else {
            warn!(recent_win_rate, "Win rate outside [0, 1], clamping");
            recent_win_rate.clamp(0.0, 1.0)
        };

        let drawdown_pct = if peak_equity > 0.0 {
            ((peak_equity - current_equity) / peak_equity).max(0.0)
        } else {
            0.0
        };

        let score = self.score_for(drawdown_pct, win_rate);
        let halted = drawdown_pct >= self.config.halt_drawdown_pct
            || (self.halted && drawdown_pct >= self.config.halt_release_pct);
        if halted != self.halted {
            info!(drawdown_pct, halted, "Drawdown halt changed");
            self.halted = halted;
        }
        let next = if halted {
            HealthState::Defensive
        } else {
            self.next_state(score)
        };

        if next != self.state {
            info!(
                from = %self.state,
                to = %next,
                score,
                drawdown_pct,
                win_rate,
                "Health state transition"
            );
            increment_counter(CounterMetric::HealthTransition);
        }

        self.state = next;
        self.score = score;
        self.drawdown_pct = drawdown_pct;
        next
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    /// Latest composite score
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Latest drawdown seen by the monitor
    pub fn drawdown_pct(&self) -> f64 {
        self.drawdown_pct
    }

    /// Force a state, bypassing the score
    pub fn force(&mut self, state: HealthState) {
        if state != self.state {
            warn!(from = %self.state, to = %state, "Health state forced");
            self.state = state;
        }
    }

    /// True while the drawdown halt holds the state at Defensive
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn reset(&mut self) {
        self.state = HealthState::Nominal;
        self.score = 1.0;
        self.drawdown_pct = 0.0;
        self.halted = false;
    }

    fn score_for(&self, drawdown_pct: f64, win_rate: f64) -> f64 {
        let headroom = 1.0 - (drawdown_pct / self.config.drawdown_scale).min(1.0);
        let w = self.config.drawdown_weight;
        (w * headroom + (1.0 - w) * win_rate).clamp(0.0, 1.0)
    }

    fn next_state(&self, score: f64) -> HealthState {
        let upper = self.config.upper_threshold;
        let lower = self.config.lower_threshold;
        let margin = self.config.hysteresis_margin;

        match self.state {
            HealthState::Nominal if score < lower => HealthState::Defensive,
            HealthState::Nominal if score < upper => HealthState::Cautious,
            HealthState::Nominal => HealthState::Nominal,
            HealthState::Cautious if score < lower => HealthState::Defensive,
            HealthState::Cautious if score >= upper + margin => HealthState::Nominal,
            HealthState::Cautious => HealthState::Cautious,
            HealthState::Defensive if score >= upper + margin => HealthState::Nominal,
            HealthState::Defensive if score >= lower + margin => HealthState::Cautious,
            HealthState::Defensive => HealthState::Defensive,
        }
    }
}
