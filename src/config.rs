//! Configuration types for adaptive-sizing
//!
//! Every section has defaults so an empty file is a valid configuration.
//! Components validate their own section at construction time.

use serde::{Deserialize, Serialize};

use crate::error::ControlError;
use crate::telemetry::LogFormat;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub volatility: VolatilityConfig,
    #[serde(default)]
    pub regime: RegimeConfig,
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub thompson: ThompsonConfig,
    #[serde(default)]
    pub particle: ParticleConfig,
    #[serde(default)]
    pub pid: PidConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Dual-EMA volatility estimation
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VolatilityConfig {
    /// Smoothing for the fast ("current") variance
    pub fast_alpha: f64,
    /// Smoothing for the slow baseline variance
    pub slow_alpha: f64,
    /// Lower bound applied whenever the baseline is used as a denominator
    pub variance_floor: f64,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            fast_alpha: 0.1,
            slow_alpha: 0.01,
            variance_floor: 1e-12,
        }
    }
}

impl VolatilityConfig {
    pub fn validate(&self) -> Result<(), ControlError> {
        unit_interval("volatility.fast_alpha", self.fast_alpha)?;
        unit_interval("volatility.slow_alpha", self.slow_alpha)?;
        if self.slow_alpha > self.fast_alpha {
            return Err(ControlError::config(
                "volatility.slow_alpha must not exceed volatility.fast_alpha",
            ));
        }
        positive("volatility.variance_floor", self.variance_floor)
    }
}

/// Spectral regime detection
///
/// The alpha thresholds are tunable design choices. They need empirical
/// calibration per market and are not derived from first principles.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegimeConfig {
    /// Capacity of the rolling return buffer
    pub window_size: usize,
    /// Samples required before any classification other than Unknown
    pub min_samples: usize,
    /// Recompute the spectrum every N new samples
    pub update_interval: usize,
    /// Welch segment length
    pub segment_length: usize,
    /// Alpha below this is mean-reverting
    pub mean_reverting_below: f64,
    /// Alpha at or above this is trending
    pub trending_above: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            window_size: 256,
            min_samples: 64,
            update_interval: 10,
            segment_length: 64,
            mean_reverting_below: 0.5,
            trending_above: 1.5,
        }
    }
}

impl RegimeConfig {
    pub fn validate(&self) -> Result<(), ControlError> {
        if self.window_size < 32 {
            return Err(ControlError::config(
                "regime.window_size must be >= 32 for spectral analysis",
            ));
        }
        if self.min_samples < 8 || self.min_samples > self.window_size {
            return Err(ControlError::config(
                "regime.min_samples must be in [8, regime.window_size]",
            ));
        }
        if self.update_interval == 0 {
            return Err(ControlError::config("regime.update_interval must be >= 1"));
        }
        if self.segment_length < 8 {
            return Err(ControlError::config("regime.segment_length must be >= 8"));
        }
        finite("regime.mean_reverting_below", self.mean_reverting_below)?;
        finite("regime.trending_above", self.trending_above)?;
        if self.mean_reverting_below >= self.trending_above {
            return Err(ControlError::config(
                "regime.mean_reverting_below must be below regime.trending_above",
            ));
        }
        Ok(())
    }
}

/// SOPS + power-law position sizing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Base tanh steepness before volatility adaptation
    pub k_base: f64,
    pub k_min: f64,
    pub k_max: f64,
    /// Steepness used while the volatility baseline is still at its floor
    pub default_k: f64,
    /// Power-law exponent applied to the signal magnitude
    pub power: f64,
    /// Largest absolute position fraction
    pub max_size: f64,
    /// Decimal places kept when converting a fraction to notional
    pub notional_dp: u32,
    /// EMA smoothing for the tape-speed arrival rate
    pub tape_alpha: f64,
    /// Rate ratio above which the tape is fast
    pub tape_fast_ratio: f64,
    /// Rate ratio below which the tape is slow
    pub tape_slow_ratio: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            k_base: 1.0,
            k_min: 0.1,
            k_max: 5.0,
            default_k: 0.5,
            power: 0.5,
            max_size: 1.0,
            notional_dp: 2,
            tape_alpha: 0.1,
            tape_fast_ratio: 1.5,
            tape_slow_ratio: 0.5,
        }
    }
}

impl SizingConfig {
    pub fn validate(&self) -> Result<(), ControlError> {
        positive("sizing.k_base", self.k_base)?;
        positive("sizing.k_min", self.k_min)?;
        positive("sizing.default_k", self.default_k)?;
        finite("sizing.k_max", self.k_max)?;
        if self.k_min > self.k_max {
            return Err(ControlError::config("sizing.k_min must not exceed sizing.k_max"));
        }
        if !(self.power > 0.0 && self.power < 1.0) {
            return Err(ControlError::config(format!(
                "sizing.power must be in (0, 1), got {}",
                self.power
            )));
        }
        positive("sizing.max_size", self.max_size)?;
        unit_interval("sizing.tape_alpha", self.tape_alpha)?;
        positive("sizing.tape_slow_ratio", self.tape_slow_ratio)?;
        finite("sizing.tape_fast_ratio", self.tape_fast_ratio)?;
        if self.tape_slow_ratio >= self.tape_fast_ratio {
            return Err(ControlError::config(
                "sizing.tape_slow_ratio must be below sizing.tape_fast_ratio",
            ));
        }
        Ok(())
    }
}

/// Meta-labeling bet calibration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Largest bet fraction
    pub max_bet: f64,
    /// Minimum (probability, outcome) pairs needed to fit a curve
    pub min_fit_samples: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            max_bet: 1.0,
            min_fit_samples: 20,
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> Result<(), ControlError> {
        positive("calibration.max_bet", self.max_bet)?;
        if self.min_fit_samples < 2 {
            return Err(ControlError::config("calibration.min_fit_samples must be >= 2"));
        }
        Ok(())
    }
}

/// Thompson sampling over strategies
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThompsonConfig {
    /// Forgetting factor applied to every posterior each update
    pub decay: f64,
    /// Lower bound for alpha and beta after decay
    pub floor: f64,
    pub prior_alpha: f64,
    pub prior_beta: f64,
    /// Realized PnL observations kept per strategy
    pub pnl_window: usize,
    /// Fixed seed for reproducible sampling
    pub seed: Option<u64>,
}

impl Default for ThompsonConfig {
    fn default() -> Self {
        Self {
            decay: 0.99,
            floor: 0.1,
            prior_alpha: 1.0,
            prior_beta: 1.0,
            pnl_window: 50,
            seed: None,
        }
    }
}

impl ThompsonConfig {
    pub fn validate(&self) -> Result<(), ControlError> {
        if !(self.decay > 0.0 && self.decay < 1.0) {
            return Err(ControlError::config(format!(
                "thompson.decay must be in (0, 1), got {}",
                self.decay
            )));
        }
        positive("thompson.floor", self.floor)?;
        positive("thompson.prior_alpha", self.prior_alpha)?;
        positive("thompson.prior_beta", self.prior_beta)?;
        if self.prior_alpha < self.floor || self.prior_beta < self.floor {
            return Err(ControlError::config("thompson priors must be >= thompson.floor"));
        }
        if self.pnl_window == 0 {
            return Err(ControlError::config("thompson.pnl_window must be >= 1"));
        }
        Ok(())
    }
}

/// Particle filter over strategy weight vectors
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ParticleConfig {
    /// Population size
    pub particles: usize,
    /// Resample when ESS / particles drops below this
    pub resample_threshold: f64,
    /// Standard deviation of post-resample jitter
    pub jitter_std: f64,
    /// Multiplier on portfolio PnL in the log-likelihood
    pub likelihood_scale: f64,
    /// Fixed seed for reproducible resampling
    pub seed: Option<u64>,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            particles: 100,
            resample_threshold: 0.5,
            jitter_std: 0.02,
            likelihood_scale: 1.0,
            seed: None,
        }
    }
}

impl ParticleConfig {
    pub fn validate(&self) -> Result<(), ControlError> {
        if self.particles < 2 {
            return Err(ControlError::config("particle.particles must be >= 2"));
        }
        unit_interval("particle.resample_threshold", self.resample_threshold)?;
        non_negative("particle.jitter_std", self.jitter_std)?;
        positive("particle.likelihood_scale", self.likelihood_scale)
    }
}

/// PID drawdown control
///
/// Gains are fixed constants. Auto-tuning is a possible extension and is not
/// performed here.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PidConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Absolute bound on the accumulated error (anti-windup)
    pub integral_limit: f64,
    /// Drawdown the controller steers toward
    pub target_drawdown_pct: f64,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 2.0,
            ki: 0.1,
            kd: 0.5,
            integral_limit: 0.5,
            target_drawdown_pct: 0.05,
        }
    }
}

/// Gains above this are treated as misconfiguration
const MAX_GAIN: f64 = 100.0;

impl PidConfig {
    pub fn validate(&self) -> Result<(), ControlError> {
        for (name, gain) in [("pid.kp", self.kp), ("pid.ki", self.ki), ("pid.kd", self.kd)] {
            non_negative(name, gain)?;
            if gain > MAX_GAIN {
                return Err(ControlError::config(format!(
                    "{name} must be <= {MAX_GAIN}, got {gain}"
                )));
            }
        }
        positive("pid.integral_limit", self.integral_limit)?;
        open_unit_interval("pid.target_drawdown_pct", self.target_drawdown_pct)
    }
}

/// Health state machine
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Score below this leaves Nominal
    pub upper_threshold: f64,
    /// Score below this enters Defensive
    pub lower_threshold: f64,
    /// Extra score needed to move back up past a threshold
    pub hysteresis_margin: f64,
    /// Share of the score given to drawdown (rest is win rate)
    pub drawdown_weight: f64,
    /// Drawdown at which the drawdown component reaches zero
    pub drawdown_scale: f64,
    /// Drawdown that forces Defensive regardless of score
    pub halt_drawdown_pct: f64,
    /// Once halted, drawdown must fall below this before the score applies again
    pub halt_release_pct: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            upper_threshold: 0.7,
            lower_threshold: 0.4,
            hysteresis_margin: 0.05,
            drawdown_weight: 0.6,
            drawdown_scale: 0.20,
            halt_drawdown_pct: 0.10,
            halt_release_pct: 0.08,
        }
    }
}

impl HealthConfig {
    pub fn validate(&self) -> Result<(), ControlError> {
        open_unit_interval("health.lower_threshold", self.lower_threshold)?;
        open_unit_interval("health.upper_threshold", self.upper_threshold)?;
        if self.lower_threshold >= self.upper_threshold {
            return Err(ControlError::config(
                "health.lower_threshold must be below health.upper_threshold",
            ));
        }
        non_negative("health.hysteresis_margin", self.hysteresis_margin)?;
        if self.upper_threshold + self.hysteresis_margin > 1.0 {
            return Err(ControlError::config(
                "health.upper_threshold + health.hysteresis_margin must be <= 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.drawdown_weight) {
            return Err(ControlError::config("health.drawdown_weight must be in [0, 1]"));
        }
        positive("health.drawdown_scale", self.drawdown_scale)?;
        unit_interval("health.halt_drawdown_pct", self.halt_drawdown_pct)?;
        unit_interval("health.halt_release_pct", self.halt_release_pct)?;
        if self.halt_release_pct > self.halt_drawdown_pct {
            return Err(ControlError::config(
                "health.halt_release_pct must be <= health.halt_drawdown_pct",
            ));
        }
        Ok(())
    }
}

/// Orchestration and blending
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Thompson share of the blend while Nominal
    pub blend_nominal: f64,
    /// Thompson share of the blend while Cautious
    pub blend_cautious: f64,
    /// Thompson share of the blend while Defensive
    pub blend_defensive: f64,
    /// Risk factor applied while Cautious
    pub cautious_risk_factor: f64,
    /// Risk factor applied while Defensive
    pub defensive_risk_factor: f64,
    /// Observations a strategy needs before it keeps weight while Defensive
    pub min_track_record: u64,
    /// Recent PnL observations per strategy used for harmony
    pub harmony_lookback: usize,
    /// Loss, as a fraction of equity, that makes the book dissonant
    pub harmony_loss_fraction: f64,
    /// Risk factor while recent book PnL is flat or slightly negative
    pub resolving_risk_factor: f64,
    /// Risk factor while recent book PnL is dissonant
    pub dissonant_risk_factor: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            blend_nominal: 0.5,
            blend_cautious: 0.25,
            blend_defensive: 0.25,
            cautious_risk_factor: 0.5,
            defensive_risk_factor: 0.25,
            min_track_record: 20,
            harmony_lookback: 10,
            harmony_loss_fraction: 0.001,
            resolving_risk_factor: 0.7,
            dissonant_risk_factor: 0.3,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), ControlError> {
        for (name, share) in [
            ("controller.blend_nominal", self.blend_nominal),
            ("controller.blend_cautious", self.blend_cautious),
            ("controller.blend_defensive", self.blend_defensive),
            ("controller.cautious_risk_factor", self.cautious_risk_factor),
            ("controller.defensive_risk_factor", self.defensive_risk_factor),
            ("controller.resolving_risk_factor", self.resolving_risk_factor),
            ("controller.dissonant_risk_factor", self.dissonant_risk_factor),
        ] {
            if !(0.0..=1.0).contains(&share) {
                return Err(ControlError::config(format!("{name} must be in [0, 1]")));
            }
        }
        if self.defensive_risk_factor > self.cautious_risk_factor {
            return Err(ControlError::config(
                "controller.defensive_risk_factor must be <= controller.cautious_risk_factor",
            ));
        }
        if self.dissonant_risk_factor > self.resolving_risk_factor {
            return Err(ControlError::config(
                "controller.dissonant_risk_factor must be <= controller.resolving_risk_factor",
            ));
        }
        if self.harmony_lookback == 0 {
            return Err(ControlError::config("controller.harmony_lookback must be >= 1"));
        }
        non_negative("controller.harmony_loss_fraction", self.harmony_loss_fraction)
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    /// Install the Prometheus recorder in the host binary
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load`], but `Ok(None)` when the file does not exist
    ///
    /// Parse and validation errors are still returned.
    pub fn load_optional(path: impl AsRef<std::path::Path>) -> anyhow::Result<Option<Self>> {
        match Self::load(path) {
            Ok(config) => Ok(Some(config)),
            Err(e)
                if e
                    .downcast_ref::<std::io::Error>()
                    .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound) =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ControlError> {
        self.volatility.validate()?;
        self.regime.validate()?;
        self.sizing.validate()?;
        self.calibration.validate()?;
        self.thompson.validate()?;
        self.particle.validate()?;
        self.pid.validate()?;
        self.health.validate()?;
        self.controller.validate()
    }
}

fn finite(name: &str, value: f64) -> Result<(), ControlError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ControlError::config(format!("{name} must be finite")))
    }
}

fn positive(name: &str, value: f64) -> Result<(), ControlError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ControlError::config(format!("{name} must be > 0, got {value}")))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), ControlError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ControlError::config(format!("{name} must be >= 0, got {value}")))
    }
}

/// (0, 1]
fn unit_interval(name: &str, value: f64) -> Result<(), ControlError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ControlError::config(format!("{name} must be in (0, 1], got {value}")))
    }
}

/// (0, 1)
fn open_unit_interval(name: &str, value: f64) -> Result<(), ControlError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ControlError::config(format!("{name} must be in (0, 1), got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            [volatility]
            fast_alpha = 0.2
            slow_alpha = 0.02

            [regime]
            window_size = 128
            min_samples = 32
            update_interval = 5

            [sizing]
            power = 0.6
            max_size = 0.5

            [thompson]
            decay = 0.95
            seed = 7

            [particle]
            particles = 50

            [pid]
            kp = 1.5
            target_drawdown_pct = 0.03

            [health]
            upper_threshold = 0.65

            [controller]
            min_track_record = 5

            [telemetry]
            log_level = "debug"
            log_format = "json"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.volatility.fast_alpha, 0.2);
        assert_eq!(config.regime.window_size, 128);
        assert_eq!(config.sizing.max_size, 0.5);
        assert_eq!(config.thompson.seed, Some(7));
        assert_eq!(config.particle.particles, 50);
        assert_eq!(config.pid.target_drawdown_pct, 0.03);
        assert_eq!(config.controller.min_track_record, 5);
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
        // Untouched fields keep their defaults
        assert_eq!(config.regime.segment_length, 64);
        assert_eq!(config.health.lower_threshold, 0.4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.thompson.seed, None);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_negative_gain_rejected() {
        let mut config = Config::default();
        config.pid.kp = -1.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ControlError::Configuration(_)));
        assert!(err.to_string().contains("pid.kp"));
    }

    #[test]
    fn test_absurd_gain_rejected() {
        let mut config = Config::default();
        config.pid.kd = 1e6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_small_regime_window_rejected() {
        let mut config = Config::default();
        config.regime.window_size = 16;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_min_samples_above_window_rejected() {
        let mut config = Config::default();
        config.regime.min_samples = 512;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_regime_thresholds_rejected() {
        let mut config = Config::default();
        config.regime.mean_reverting_below = 2.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_linear_power_rejected() {
        let mut config = Config::default();
        config.sizing.power = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_decay_bounds() {
        let mut config = Config::default();
        config.thompson.decay = 1.0;
        assert!(config.validate().is_err());
        config.thompson.decay = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_health_margin_must_leave_room() {
        let mut config = Config::default();
        config.health.upper_threshold = 0.98;
        config.health.hysteresis_margin = 0.05;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_risk_factor_ordering() {
        let mut config = Config::default();
        config.controller.defensive_risk_factor = 0.6;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.controller.dissonant_risk_factor = 0.8;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.controller.resolving_risk_factor = 1.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_halt_release_above_halt_rejected() {
        let mut config = Config::default();
        config.health.halt_release_pct = 0.15;
        assert!(matches!(
            config.validate(),
            Err(ControlError::Configuration(_))
        ));
    }

    #[test]
    fn test_single_particle_rejected() {
        let mut config = Config::default();
        config.particle.particles = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_config_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pid]\nkp = 3.0\n").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.pid.kp, 3.0);
    }

    #[test]
    fn test_config_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[health]\nlower_threshold = 0.9\n").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_config_load_optional() {
        assert!(Config::load_optional("/nonexistent/config.toml")
            .unwrap()
            .is_none());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[thompson]\ndecay = 1.5").unwrap();
        let err = Config::load_optional(file.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ControlError>(),
            Some(ControlError::Configuration(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pid\nkp = 1.0").unwrap();
        assert!(Config::load_optional(file.path()).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pid]\nkp = 1.0").unwrap();
        let config = Config::load_optional(file.path()).unwrap().unwrap();
        assert_eq!(config.pid.kp, 1.0);
    }

    #[test]
    fn test_config_roundtrips_through_toml() {
        let config = Config::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.pid.kp, config.pid.kp);
        assert_eq!(parsed.regime.window_size, config.regime.window_size);
    }
}
