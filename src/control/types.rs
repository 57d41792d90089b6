//! Controller output and supporting types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::allocation::{StrategyId, StrategyWeights};
use crate::config::ControllerConfig;
use crate::error::ControlError;
use crate::model::{MarketRegime, RegimeClassification};
use crate::risk::HealthState;

/// Agreement between recent strategy PnL and the market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketHarmony {
    /// Recent book PnL is positive
    Consonant,
    /// Recent book PnL is flat or slightly negative
    Resolving,
    /// Recent book PnL lost more than the configured share of equity
    Dissonant,
}

impl MarketHarmony {
    /// Risk factor applied to the multiplier
    pub fn risk_factor(self, config: &ControllerConfig) -> f64 {
        match self {
            MarketHarmony::Consonant => 1.0,
            MarketHarmony::Resolving => config.resolving_risk_factor,
            MarketHarmony::Dissonant => config.dissonant_risk_factor,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MarketHarmony::Consonant => "consonant",
            MarketHarmony::Resolving => "resolving",
            MarketHarmony::Dissonant => "dissonant",
        }
    }
}

impl fmt::Display for MarketHarmony {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How well a strategy suits each regime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeAffinity {
    pub mean_reverting: f64,
    pub normal: f64,
    pub trending: f64,
}

impl RegimeAffinity {
    pub fn new(mean_reverting: f64, normal: f64, trending: f64) -> Self {
        Self {
            mean_reverting,
            normal,
            trending,
        }
    }

    /// Affinity for `regime`; unknown regimes use the normal entry
    pub fn for_regime(&self, regime: MarketRegime) -> f64 {
        match regime {
            MarketRegime::MeanReverting => self.mean_reverting,
            MarketRegime::Normal | MarketRegime::Unknown => self.normal,
            MarketRegime::Trending => self.trending,
        }
    }

    pub fn validate(&self) -> Result<(), ControlError> {
        for (field, value) in [
            ("affinity.mean_reverting", self.mean_reverting),
            ("affinity.normal", self.normal),
            ("affinity.trending", self.trending),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ControlError::invalid_input(field, value));
            }
        }
        Ok(())
    }
}

impl Default for RegimeAffinity {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

/// Immutable per-tick controller snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerOutput {
    /// Tick counter, starting at 1
    pub tick: u64,
    pub timestamp: DateTime<Utc>,
    /// Global multiplier in [0, 1]
    pub risk_multiplier: f64,
    /// Sums to one, or to zero when fully defensive
    pub strategy_weights: StrategyWeights,
    pub health_state: HealthState,
    pub regime_classification: RegimeClassification,
    pub harmony: MarketHarmony,
    pub drawdown_pct: f64,
    pub vol_ratio: f64,
    /// True when this is the conservative fallback after an internal failure
    pub degraded: bool,
}

impl ControllerOutput {
    /// Most conservative output: no risk, uniform weights
    pub fn conservative<'a>(
        tick: u64,
        strategies: impl IntoIterator<Item = &'a StrategyId>,
        drawdown_pct: f64,
    ) -> Self {
        Self {
            tick,
            timestamp: Utc::now(),
            risk_multiplier: 0.0,
            strategy_weights: crate::allocation::uniform_weights(strategies),
            health_state: HealthState::Defensive,
            regime_classification: RegimeClassification::Unknown,
            harmony: MarketHarmony::Dissonant,
            drawdown_pct: if drawdown_pct.is_finite() {
                drawdown_pct
            } else {
                0.0
            },
            vol_ratio: 0.0,
            degraded: true,
        }
    }

    /// Weight of one strategy, zero when absent
    pub fn weight(&self, id: &StrategyId) -> f64 {
        self.strategy_weights.get(id).copied().unwrap_or(0.0)
    }

    /// Combined multiplier for one strategy's position size
    pub fn multiplier_for(&self, id: &StrategyId) -> f64 {
        self.risk_multiplier * self.weight(id)
    }
}
