//! Strategy allocation module
//!
//! Thompson sampling and particle filtering over a set of strategies, plus the
//! weight-vector helpers both share

mod particle;
mod record;
mod thompson;
mod weights;

pub use particle::ParticleFilterEnsemble;
pub use record::{StrategyId, StrategyPerformanceRecord};
pub use thompson::ThompsonStrategySelector;
pub use weights::{is_normalized, normalize_weights, uniform_weights, StrategyWeights, SUM_TOLERANCE};
pub(crate) use weights::normalize_slice;
