//! Control module
//!
//! Per-tick orchestration of the model, risk and allocation components

mod meta;
mod types;

pub use meta::MetaController;
pub use types::{ControllerOutput, MarketHarmony, RegimeAffinity};
