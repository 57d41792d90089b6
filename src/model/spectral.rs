//! Spectral regime detection
//!
//! Classifies the market by the slope of the power spectral density of recent
//! returns (the "noise colour"): PSD ~ f^(-alpha). White noise has alpha ~ 0,
//! pink noise ~ 1 and brown noise ~ 2.
//!
//! The PSD is a Welch estimate: Hann-windowed segments with 50% overlap and
//! per-segment mean removal, averaged. The spectrum is recomputed every
//! `update_interval` samples and cached in between.

use std::collections::VecDeque;
use std::f64::consts::PI;

use tracing::{debug, warn};

use super::types::{RegimeClassification, SpectralFit};
use crate::config::RegimeConfig;
use crate::error::ControlError;
use crate::telemetry::{increment_counter, CounterMetric};

/// Keeps log10 of an empty frequency bin finite
const PSD_FLOOR: f64 = 1e-30;

/// Rolling spectral-slope regime classifier
pub struct SpectralRegimeDetector {
    config: RegimeConfig,
    returns: VecDeque<f64>,
    since_recompute: usize,
    cached: Option<RegimeClassification>,
}

impl SpectralRegimeDetector {
    /// Create a new detector, validating the configuration
    pub fn new(config: &RegimeConfig) -> Result<Self, ControlError> {
        config.validate()?;
        Ok(Self {
            returns: VecDeque::with_capacity(config.window_size),
            config: config.clone(),
            since_recompute: 0,
            cached: None,
        })
    }

    /// Add a return and classify the current window
    ///
    /// Returns `Unknown` until `min_samples` returns have been observed. The
    /// call that completes the warm-up always computes a fresh classification.
    pub fn observe(&mut self, return_value: f64) -> RegimeClassification {
        if !return_value.is_finite() {
            warn!(value = return_value, "Ignoring non-finite return in regime detector");
            increment_counter(CounterMetric::RejectedInput);
            return self.current();
        }

        if self.returns.len() == self.config.window_size {
            self.returns.pop_front();
        }
        self.returns.push_back(return_value);
        self.since_recompute += 1;

        if self.returns.len() < self.config.min_samples {
            return RegimeClassification::Unknown;
        }

        match self.cached {
            Some(cached) if self.since_recompute < self.config.update_interval => cached,
            _ => {
                let classification = self.analyze();
                self.cached = Some(classification);
                self.since_recompute = 0;
                classification
            }
        }
    }

    /// Latest classification without adding a sample
    pub fn current(&self) -> RegimeClassification {
        if self.returns.len() < self.config.min_samples {
            return RegimeClassification::Unknown;
        }
        self.cached.unwrap_or(RegimeClassification::Unknown)
    }

    /// Number of buffered returns
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    pub fn reset(&mut self) {
        self.returns.clear();
        self.since_recompute = 0;
        self.cached = None;
    }

    fn analyze(&self) -> RegimeClassification {
        let data: Vec<f64> = self.returns.iter().copied().collect();
        let segment = self.config.segment_length.min(data.len());
        let (freqs, psd) = welch(&data, segment);

        // Skip the DC bin
        let points: Vec<(f64, f64, f64)> = freqs
            .iter()
            .zip(psd.iter())
            .skip(1)
            .map(|(&f, &p)| (f.log10(), (p + PSD_FLOOR).log10(), p))
            .collect();

        let total_power: f64 = points.iter().map(|&(_, _, p)| p).sum();
        if points.len() < 3 || total_power <= PSD_FLOOR {
            debug!(samples = data.len(), "Spectrum carries no power, regime unknown");
            return RegimeClassification::Unknown;
        }

        let Some((slope, r_squared)) = fit_line(&points) else {
            return RegimeClassification::Unknown;
        };
        let alpha = -slope;

        let dominant_period = points
            .iter()
            .zip(freqs.iter().skip(1))
            .max_by(|a, b| a.0 .2.total_cmp(&b.0 .2))
            .map(|(_, &f)| 1.0 / f);

        let fit = SpectralFit {
            alpha,
            confidence: r_squared.clamp(0.0, 1.0),
            dominant_period,
        };

        debug!(
            alpha = fit.alpha,
            confidence = fit.confidence,
            samples = data.len(),
            "Spectral regime recomputed"
        );

        if alpha < self.config.mean_reverting_below {
            RegimeClassification::MeanReverting(fit)
        } else if alpha < self.config.trending_above {
            RegimeClassification::Normal(fit)
        } else {
            RegimeClassification::Trending(fit)
        }
    }
}

/// Welch power spectral density estimate
///
/// Returns one-sided frequencies (cycles per sample) and densities for
/// `segment / 2 + 1` bins.
fn welch(data: &[f64], segment: usize) -> (Vec<f64>, Vec<f64>) {
    let bins = segment / 2 + 1;
    let step = (segment / 2).max(1);

    let window: Vec<f64> = (0..segment)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / segment as f64).cos())
        .collect();
    let window_power: f64 = window.iter().map(|w| w * w).sum();

    // Twiddle tables indexed by (k * t) mod segment
    let cos_table: Vec<f64> = (0..segment)
        .map(|j| (2.0 * PI * j as f64 / segment as f64).cos())
        .collect();
    let sin_table: Vec<f64> = (0..segment)
        .map(|j| (2.0 * PI * j as f64 / segment as f64).sin())
        .collect();

    let mut psd = vec![0.0; bins];
    let mut segments = 0usize;
    let mut tapered = vec![0.0; segment];

    let mut start = 0;
    while start + segment <= data.len() {
        let slice = &data[start..start + segment];
        let mean = slice.iter().sum::<f64>() / segment as f64;
        for (t, value) in slice.iter().enumerate() {
            tapered[t] = (value - mean) * window[t];
        }

        for (k, bin) in psd.iter_mut().enumerate() {
            let mut re = 0.0;
            let mut im = 0.0;
            for (t, x) in tapered.iter().enumerate() {
                let j = (k * t) % segment;
                re += x * cos_table[j];
                im -= x * sin_table[j];
            }
            let mut power = (re * re + im * im) / window_power;
            // One-sided: double everything except DC and Nyquist
            if k > 0 && 2 * k != segment {
                power *= 2.0;
            }
            *bin += power;
        }

        segments += 1;
        start += step;
    }

    if segments > 0 {
        for bin in psd.iter_mut() {
            *bin /= segments as f64;
        }
    }

    let freqs = (0..bins).map(|k| k as f64 / segment as f64).collect();
    (freqs, psd)
}

/// Least-squares line through (x, y); returns (slope, r_squared)
fn fit_line(points: &[(f64, f64, f64)]) -> Option<(f64, f64)> {
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    let sxy: f64 = points.iter().map(|p| (p.0 - mean_x) * (p.1 - mean_y)).sum();
    if sxx <= 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let ss_tot: f64 = points.iter().map(|p| (p.1 - mean_y).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|p| (p.1 - (intercept + slope * p.0)).powi(2))
        .sum();
    let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    slope.is_finite().then_some((slope, r_squared))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MarketRegime;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn detector() -> SpectralRegimeDetector {
        SpectralRegimeDetector::new(&RegimeConfig::default()).unwrap()
    }

    fn white_noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 0.01).unwrap();
        (0..n).map(|_| normal.sample(&mut rng)).collect()
    }

    fn slow_wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 0.01 * (2.0 * PI * i as f64 / 128.0).sin())
            .collect()
    }

    #[test]
    fn test_unknown_until_min_samples() {
        let mut detector = detector();
        let returns = white_noise(64, 1);
        for r in &returns[..63] {
            let classification = detector.observe(*r);
            assert_eq!(classification, RegimeClassification::Unknown);
            assert_eq!(classification.confidence(), 0.0);
        }
        let filled = detector.observe(returns[63]);
        assert!(!filled.is_unknown());
    }

    #[test]
    fn test_white_noise_is_mean_reverting() {
        let mut detector = detector();
        let mut last = RegimeClassification::Unknown;
        for r in white_noise(256, 7) {
            last = detector.observe(r);
        }
        assert_eq!(last.regime(), MarketRegime::MeanReverting);
        assert!(last.alpha() < 0.5);
        assert!((0.0..=1.0).contains(&last.confidence()));
    }

    #[test]
    fn test_slow_wave_is_trending() {
        let mut detector = detector();
        let mut last = RegimeClassification::Unknown;
        for r in slow_wave(256) {
            last = detector.observe(r);
        }
        assert_eq!(last.regime(), MarketRegime::Trending);
        assert!(last.alpha() > 1.5);
        assert!(last.confidence() > 0.5);
    }

    #[test]
    fn test_dominant_period_reported() {
        let mut detector = detector();
        let mut last = RegimeClassification::Unknown;
        for r in slow_wave(256) {
            last = detector.observe(r);
        }
        let period = last.fit().and_then(|fit| fit.dominant_period).unwrap();
        // Lowest resolvable bin of a 64-sample segment
        assert!((period - 64.0).abs() < 1e-9);
    }

    #[test]
    fn test_recompute_cadence() {
        let mut detector = detector();
        let noise = white_noise(64, 3);
        let mut first = RegimeClassification::Unknown;
        for r in &noise {
            first = detector.observe(*r);
        }
        // The next update_interval - 1 samples reuse the cached result,
        // whatever they contain
        for i in 0..9 {
            let classification = detector.observe(0.01 * (2.0 * PI * i as f64 / 128.0).sin());
            assert_eq!(classification, first);
        }
    }

    #[test]
    fn test_non_finite_input_ignored() {
        let mut detector = detector();
        for r in white_noise(10, 5) {
            detector.observe(r);
        }
        assert_eq!(detector.observe(f64::NAN), RegimeClassification::Unknown);
        assert_eq!(detector.len(), 10);
    }

    #[test]
    fn test_constant_returns_stay_unknown() {
        let mut detector = detector();
        let mut last = RegimeClassification::Normal(SpectralFit {
            alpha: 1.0,
            confidence: 1.0,
            dominant_period: None,
        });
        for _ in 0..100 {
            last = detector.observe(0.0);
        }
        assert!(last.is_unknown());
    }

    #[test]
    fn test_buffer_bounded_by_window() {
        let mut detector = detector();
        for r in white_noise(600, 11) {
            detector.observe(r);
        }
        assert_eq!(detector.len(), 256);
        detector.reset();
        assert!(detector.is_empty());
        assert!(detector.current().is_unknown());
    }

    #[test]
    fn test_welch_white_noise_is_flat() {
        let data = white_noise(256, 13);
        let (freqs, psd) = welch(&data, 64);
        assert_eq!(freqs.len(), 33);
        assert_eq!(psd.len(), 33);
        assert!((freqs[32] - 0.5).abs() < 1e-12);
        // Variance is 1e-4; one-sided density averages about 2 * variance
        let mean: f64 = psd[1..32].iter().sum::<f64>() / 31.0;
        assert!(mean > 1e-4 && mean < 4e-4, "mean = {mean}");
    }
}
