//! Strategy weight vectors

use std::collections::BTreeMap;

use super::record::StrategyId;

/// Weight per strategy, ordered by id
pub type StrategyWeights = BTreeMap<StrategyId, f64>;

/// Tolerance used when checking that weights sum to one
pub const SUM_TOLERANCE: f64 = 1e-9;

/// Equal weights over `ids`
pub fn uniform_weights<'a>(ids: impl IntoIterator<Item = &'a StrategyId>) -> StrategyWeights {
    let mut weights: StrategyWeights = ids.into_iter().map(|id| (id.clone(), 1.0)).collect();
    let n = weights.len() as f64;
    for w in weights.values_mut() {
        *w /= n;
    }
    weights
}

/// Scale weights to sum to one
///
/// Negative entries count as zero. Returns false, leaving the map untouched,
/// when the total is zero or not finite.
pub fn normalize_weights(weights: &mut StrategyWeights) -> bool {
    let total: f64 = weights.values().map(|w| w.max(0.0)).sum();
    if !(total.is_finite() && total > 0.0) {
        return false;
    }
    for w in weights.values_mut() {
        *w = w.max(0.0) / total;
    }
    true
}

/// Scale a slice to sum to one, falling back to uniform
pub(crate) fn normalize_slice(values: &mut [f64]) {
    let total: f64 = values.iter().map(|v| v.max(0.0)).sum();
    if total.is_finite() && total > 0.0 {
        for v in values.iter_mut() {
            *v = v.max(0.0) / total;
        }
    } else if !values.is_empty() {
        let uniform = 1.0 / values.len() as f64;
        values.iter_mut().for_each(|v| *v = uniform);
    }
}

/// True when the weights sum to one, or to zero when `allow_zero`
pub fn is_normalized(weights: &StrategyWeights, allow_zero: bool) -> bool {
    if weights.values().any(|w| !w.is_finite() || *w < 0.0) {
        return false;
    }
    let total: f64 = weights.values().sum();
    (total - 1.0).abs() < SUM_TOLERANCE || (allow_zero && total == 0.0)
}
