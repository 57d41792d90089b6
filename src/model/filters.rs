//! First-order IIR filters
//!
//! O(1) per sample replacements for windowed means and variances.

/// First-order low-pass filter, H(z) = a / (1 - (1 - a) z^-1)
///
/// This is the trading EMA. The first sample initializes the output.
#[derive(Debug, Clone)]
pub struct IirLowPass {
    alpha: f64,
    value: Option<f64>,
}

impl IirLowPass {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, value: None }
    }

    /// Filter with EMA-period smoothing, alpha = 2 / (period + 1)
    pub fn with_period(period: usize) -> Self {
        Self::new(2.0 / (period as f64 + 1.0))
    }

    pub fn update(&mut self, x: f64) -> f64 {
        let y = match self.value {
            Some(prev) => self.alpha * x + (1.0 - self.alpha) * prev,
            None => x,
        };
        self.value = Some(y);
        y
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}

/// Exponentially weighted mean and variance
#[derive(Debug, Clone)]
pub struct RecursiveVariance {
    alpha: f64,
    mean: f64,
    variance: f64,
    initialized: bool,
}

impl RecursiveVariance {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            mean: 0.0,
            variance: 0.0,
            initialized: false,
        }
    }

    /// Process one sample and return the updated variance
    pub fn update(&mut self, x: f64) -> f64 {
        if self.initialized {
            let delta = x - self.mean;
            self.mean += self.alpha * delta;
            self.variance = (1.0 - self.alpha) * (self.variance + self.alpha * delta * delta);
        } else {
            self.mean = x;
            self.variance = 0.0;
            self.initialized = true;
        }
        self.variance
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    pub fn reset(&mut self) {
        self.mean = 0.0;
        self.variance = 0.0;
        self.initialized = false;
    }
}
