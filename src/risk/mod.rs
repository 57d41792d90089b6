//! Risk management module
//!
//! Position sizing, bet calibration, drawdown control and system health

mod calibration;
mod drawdown;
mod health;
mod pid;
mod sizing;
mod tape;

pub use calibration::{BetCalibrator, CalibrationCurve};
pub use drawdown::DrawdownState;
pub use health::{HealthState, SystemHealthMonitor};
pub use pid::{PidDrawdownController, PidState};
pub use sizing::PositionSizer;
pub use tape::{TapeRegime, TapeSpeed, TapeState};
