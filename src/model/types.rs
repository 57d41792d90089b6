//! Volatility and regime types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of the dual-EMA volatility estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityState {
    /// Fast exponential mean of the input stream
    pub ema_value: f64,
    /// Fast exponential variance
    pub ema_variance: f64,
    /// Slow exponential variance, never below `variance_floor`
    pub baseline_variance: f64,
    /// Accepted observations
    pub sample_count: u64,
    /// Floor applied to `baseline_variance`
    pub variance_floor: f64,
}

impl VolatilityState {
    /// Empty state with the baseline sitting at its floor
    pub fn empty(variance_floor: f64) -> Self {
        Self {
            ema_value: 0.0,
            ema_variance: 0.0,
            baseline_variance: variance_floor,
            sample_count: 0,
            variance_floor,
        }
    }

    /// Fast volatility over baseline volatility
    pub fn vol_ratio(&self) -> f64 {
        let baseline = self.baseline_variance.max(self.variance_floor);
        (self.ema_variance.max(0.0) / baseline).sqrt()
    }

    /// True while the baseline carries no usable history
    pub fn baseline_at_floor(&self) -> bool {
        self.baseline_variance <= self.variance_floor
    }

    /// Fast volatility (standard deviation)
    pub fn volatility(&self) -> f64 {
        self.ema_variance.max(0.0).sqrt()
    }
}

/// Coarse market regime label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    /// White-noise-like anti-persistence
    MeanReverting,
    /// Pink-noise-like
    Normal,
    /// Brown-noise-like persistence
    Trending,
    /// Not enough data
    Unknown,
}

impl MarketRegime {
    pub fn as_str(self) -> &'static str {
        match self {
            MarketRegime::MeanReverting => "mean_reverting",
            MarketRegime::Normal => "normal",
            MarketRegime::Trending => "trending",
            MarketRegime::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a log-log fit of the power spectrum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralFit {
    /// Noise colour: PSD ~ f^(-alpha)
    pub alpha: f64,
    /// R-squared of the fit, in [0, 1]
    pub confidence: f64,
    /// Period of the strongest spectral peak, in samples
    pub dominant_period: Option<f64>,
}

/// Regime classification produced by the spectral detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "regime", rename_all = "snake_case")]
pub enum RegimeClassification {
    MeanReverting(SpectralFit),
    Normal(SpectralFit),
    Trending(SpectralFit),
    Unknown,
}

impl RegimeClassification {
    pub fn regime(&self) -> MarketRegime {
        match self {
            RegimeClassification::MeanReverting(_) => MarketRegime::MeanReverting,
            RegimeClassification::Normal(_) => MarketRegime::Normal,
            RegimeClassification::Trending(_) => MarketRegime::Trending,
            RegimeClassification::Unknown => MarketRegime::Unknown,
        }
    }

    pub fn fit(&self) -> Option<&SpectralFit> {
        match self {
            RegimeClassification::MeanReverting(fit)
            | RegimeClassification::Normal(fit)
            | RegimeClassification::Trending(fit) => Some(fit),
            RegimeClassification::Unknown => None,
        }
    }

    /// Fit confidence, zero when unknown
    pub fn confidence(&self) -> f64 {
        self.fit().map_or(0.0, |fit| fit.confidence)
    }

    /// Spectral slope, zero when unknown
    pub fn alpha(&self) -> f64 {
        self.fit().map_or(0.0, |fit| fit.alpha)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, RegimeClassification::Unknown)
    }
}
