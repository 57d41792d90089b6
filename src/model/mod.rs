//! Market model module
//!
//! Volatility estimation, spectral regime detection and the recursive
//! filters both are built on

mod filters;
mod spectral;
mod types;
mod volatility;

pub use filters::{IirLowPass, RecursiveVariance};
pub use spectral::SpectralRegimeDetector;
pub use types::{MarketRegime, RegimeClassification, SpectralFit, VolatilityState};
pub use volatility::VolatilityEstimator;
