//! adaptive-sizing: Adaptive position sizing and portfolio control
//!
//! This library provides the core components for:
//! - Dual-EMA volatility estimation and spectral regime detection
//! - Volatility-aware position sizing with tape-speed scaling
//! - Probability calibration for binary bets
//! - PID drawdown control and a hysteretic health state machine
//! - Thompson sampling and particle filter strategy allocation
//! - A meta controller that composes all of the above once per tick
//! - Full observability stack

pub mod allocation;
pub mod cli;
pub mod config;
pub mod control;
pub mod error;
pub mod model;
pub mod risk;
pub mod telemetry;

pub use config::Config;
pub use control::{ControllerOutput, MetaController};
pub use error::ControlError;
