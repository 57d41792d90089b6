//! Meta-labeling bet calibration
//!
//! Maps a model's predicted probability of being right into a bet fraction
//! through a monotone calibration curve. Curves are plain data so they can be
//! refit offline and swapped in at runtime.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::CalibrationConfig;
use crate::error::ControlError;
use crate::telemetry::{increment_counter, CounterMetric};

/// Newton iterations for the Platt fit
const PLATT_ITERATIONS: usize = 50;
/// Keeps logit finite at the edges of [0, 1]
const PROBABILITY_EPS: f64 = 1e-6;

/// Monotone map from predicted to calibrated probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalibrationCurve {
    /// No fitted curve; predicted probability is used as-is
    Identity,
    /// Piecewise-linear through non-decreasing (probability, rate) knots
    Isotonic { knots: Vec<(f64, f64)> },
    /// sigmoid(slope * logit(p) + intercept), slope >= 0
    Platt { slope: f64, intercept: f64 },
}

impl CalibrationCurve {
    /// Calibrated probability for `p` in [0, 1]
    pub fn apply(&self, p: f64) -> f64 {
        match self {
            CalibrationCurve::Identity => p,
            CalibrationCurve::Isotonic { knots } => interpolate(knots, p),
            CalibrationCurve::Platt { slope, intercept } => sigmoid(slope * logit(p) + intercept),
        }
    }

    /// Check the curve is usable as a monotone mapping
    pub fn validate(&self) -> Result<(), ControlError> {
        match self {
            CalibrationCurve::Identity => Ok(()),
            CalibrationCurve::Isotonic { knots } => {
                if knots.is_empty() {
                    return Err(ControlError::config("isotonic curve needs at least one knot"));
                }
                let in_range = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
                if !knots.iter().all(|&(x, y)| in_range(x) && in_range(y)) {
                    return Err(ControlError::config("isotonic knots must lie in [0, 1]"));
                }
                if knots.windows(2).any(|w| w[1].0 < w[0].0 || w[1].1 < w[0].1) {
                    return Err(ControlError::config("isotonic knots must be non-decreasing"));
                }
                Ok(())
            }
            CalibrationCurve::Platt { slope, intercept } => {
                if !(slope.is_finite() && intercept.is_finite()) || *slope < 0.0 {
                    return Err(ControlError::config(
                        "platt curve needs a finite non-negative slope",
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Converts predicted probabilities into bet fractions
#[derive(Debug, Clone)]
pub struct BetCalibrator {
    max_bet: f64,
    min_fit_samples: usize,
    curve: CalibrationCurve,
}

impl BetCalibrator {
    /// Create a calibrator with no fitted curve
    pub fn new(config: &CalibrationConfig) -> Result<Self, ControlError> {
        config.validate()?;
        Ok(Self {
            max_bet: config.max_bet,
            min_fit_samples: config.min_fit_samples,
            curve: CalibrationCurve::Identity,
        })
    }

    /// Bet fraction in [0, max_bet]
    ///
    /// Out-of-range probabilities are clamped; NaN bets nothing. Bets are
    /// zero at or below a calibrated probability of 0.5.
    pub fn calibrate(&self, predicted_probability: f64) -> f64 {
        if predicted_probability.is_nan() {
            warn!("Rejected NaN predicted probability");
            increment_counter(CounterMetric::RejectedInput);
            return 0.0;
        }
        let p = if (0.0..=1.0).contains(&predicted_probability) {
            predicted_probability
        } else {
            warn!(
                predicted_probability,
                "Predicted probability outside [0, 1], clamping"
            );
            increment_counter(CounterMetric::RejectedInput);
            predicted_probability.clamp(0.0, 1.0)
        };

        let q = self.curve.apply(p).clamp(0.0, 1.0);
        (self.max_bet * (2.0 * q - 1.0).max(0.0)).clamp(0.0, self.max_bet)
    }

    pub fn curve(&self) -> &CalibrationCurve {
        &self.curve
    }

    pub fn is_fitted(&self) -> bool {
        !matches!(self.curve, CalibrationCurve::Identity)
    }

    /// Swap in an externally fitted curve
    pub fn replace_curve(&mut self, curve: CalibrationCurve) -> Result<(), ControlError> {
        curve.validate()?;
        info!(curve = ?curve, "Calibration curve replaced");
        self.curve = curve;
        Ok(())
    }

    /// Fit an isotonic curve with pool-adjacent-violators
    pub fn fit_isotonic(&mut self, samples: &[(f64, bool)]) -> Result<(), ControlError> {
        let mut points = self.usable_samples(samples)?;
        points.sort_by(|a, b| a.0.total_cmp(&b.0));

        // Each block: (sum of x, sum of y, count)
        let mut blocks: Vec<(f64, f64, f64)> = Vec::with_capacity(points.len());
        for (x, y) in points {
            blocks.push((x, y, 1.0));
            while blocks.len() > 1 {
                let last = blocks[blocks.len() - 1];
                let prev = blocks[blocks.len() - 2];
                if prev.1 / prev.2 < last.1 / last.2 {
                    break;
                }
                blocks.pop();
                let merged = blocks.len() - 1;
                blocks[merged] = (prev.0 + last.0, prev.1 + last.1, prev.2 + last.2);
            }
        }

        let knots = blocks
            .into_iter()
            .map(|(sx, sy, n)| (sx / n, sy / n))
            .collect();
        self.replace_curve(CalibrationCurve::Isotonic { knots })
    }

    /// Fit a Platt curve by Newton's method on the logistic log-likelihood
    pub fn fit_platt(&mut self, samples: &[(f64, bool)]) -> Result<(), ControlError> {
        let points: Vec<(f64, f64)> = self
            .usable_samples(samples)?
            .into_iter()
            .map(|(p, y)| (logit(p), y))
            .collect();

        let (mut slope, mut intercept) = (1.0, 0.0);
        for _ in 0..PLATT_ITERATIONS {
            let (mut g_a, mut g_b) = (0.0, 0.0);
            let (mut h_aa, mut h_ab, mut h_bb) = (0.0, 0.0, 0.0);
            for &(x, y) in &points {
                let q = sigmoid(slope * x + intercept);
                let r = q - y;
                let w = (q * (1.0 - q)).max(1e-12);
                g_a += r * x;
                g_b += r;
                h_aa += w * x * x;
                h_ab += w * x;
                h_bb += w;
            }
            // Ridge keeps the Hessian invertible
            h_aa += 1e-6;
            h_bb += 1e-6;
            let det = h_aa * h_bb - h_ab * h_ab;
            if det.abs() < 1e-18 {
                break;
            }
            let step_a = (h_bb * g_a - h_ab * g_b) / det;
            let step_b = (h_aa * g_b - h_ab * g_a) / det;
            slope -= step_a;
            intercept -= step_b;
            if step_a.abs() < 1e-10 && step_b.abs() < 1e-10 {
                break;
            }
        }

        if !(slope.is_finite() && intercept.is_finite()) {
            return Err(ControlError::degenerate("calibration", "platt fit diverged"));
        }
        self.replace_curve(CalibrationCurve::Platt {
            slope: slope.max(0.0),
            intercept,
        })
    }

    fn usable_samples(&self, samples: &[(f64, bool)]) -> Result<Vec<(f64, f64)>, ControlError> {
        let points: Vec<(f64, f64)> = samples
            .iter()
            .filter(|(p, _)| p.is_finite())
            .map(|&(p, win)| (p.clamp(0.0, 1.0), if win { 1.0 } else { 0.0 }))
            .collect();
        if points.len() < self.min_fit_samples {
            return Err(ControlError::degenerate(
                "calibration",
                format!(
                    "need {} samples to fit, got {}",
                    self.min_fit_samples,
                    points.len()
                ),
            ));
        }
        Ok(points)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn logit(p: f64) -> f64 {
    let p = p.clamp(PROBABILITY_EPS, 1.0 - PROBABILITY_EPS);
    (p / (1.0 - p)).ln()
}

fn interpolate(knots: &[(f64, f64)], p: f64) -> f64 {
    let (Some(first), Some(last)) = (knots.first(), knots.last()) else {
        return p;
    };
    if p <= first.0 {
        return first.1;
    }
    if p >= last.0 {
        return last.1;
    }
    for w in knots.windows(2) {
        let ((x0, y0), (x1, y1)) = (w[0], w[1]);
        if p <= x1 {
            if x1 - x0 <= f64::EPSILON {
                return y1;
            }
            return y0 + (y1 - y0) * (p - x0) / (x1 - x0);
        }
    }
    last.1
}
