//! Controller metrics
//!
//! Thin wrappers over the `metrics` facade. Without an installed recorder
//! every call is a no-op.

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Global risk multiplier emitted by the controller
    RiskMultiplier,
    /// Current drawdown from peak
    DrawdownPct,
    /// Fast over baseline volatility
    VolRatio,
    /// Spectral slope of the return buffer
    SpectralAlpha,
    /// Health state as 0 (nominal), 1 (cautious), 2 (defensive)
    HealthState,
    /// Particle filter effective sample size
    EffectiveSampleSize,
    /// Number of strategies under management
    StrategyCount,
}

impl GaugeMetric {
    fn name(self) -> &'static str {
        match self {
            GaugeMetric::RiskMultiplier => "adaptive_risk_multiplier",
            GaugeMetric::DrawdownPct => "adaptive_drawdown_pct",
            GaugeMetric::VolRatio => "adaptive_vol_ratio",
            GaugeMetric::SpectralAlpha => "adaptive_spectral_alpha",
            GaugeMetric::HealthState => "adaptive_health_state",
            GaugeMetric::EffectiveSampleSize => "adaptive_particle_ess",
            GaugeMetric::StrategyCount => "adaptive_strategy_count",
        }
    }
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Ticks answered with the conservative fallback output
    ConservativeFallback,
    /// Particle population resets after underflow
    ParticleReset,
    /// Inputs rejected as non-finite or out of domain
    RejectedInput,
    /// Health state transitions
    HealthTransition,
}

impl CounterMetric {
    fn name(self) -> &'static str {
        match self {
            CounterMetric::ConservativeFallback => "adaptive_conservative_fallback_total",
            CounterMetric::ParticleReset => "adaptive_particle_reset_total",
            CounterMetric::RejectedInput => "adaptive_rejected_input_total",
            CounterMetric::HealthTransition => "adaptive_health_transition_total",
        }
    }
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    ::metrics::gauge!(metric.name()).set(value);
}

/// Increment a counter by one
pub fn increment_counter(metric: CounterMetric) {
    ::metrics::counter!(metric.name()).increment(1);
}

/// Register descriptions with the installed recorder
pub fn describe_metrics() {
    ::metrics::describe_gauge!(
        GaugeMetric::RiskMultiplier.name(),
        "Global risk multiplier in [0, 1]"
    );
    ::metrics::describe_gauge!(GaugeMetric::DrawdownPct.name(), "Drawdown from peak equity");
    ::metrics::describe_gauge!(GaugeMetric::VolRatio.name(), "Fast over baseline volatility");
    ::metrics::describe_gauge!(GaugeMetric::SpectralAlpha.name(), "PSD log-log slope");
    ::metrics::describe_gauge!(
        GaugeMetric::HealthState.name(),
        "0 nominal, 1 cautious, 2 defensive"
    );
    ::metrics::describe_gauge!(
        GaugeMetric::EffectiveSampleSize.name(),
        "Particle filter effective sample size"
    );
    ::metrics::describe_gauge!(GaugeMetric::StrategyCount.name(), "Strategies under management");
    ::metrics::describe_counter!(
        CounterMetric::ConservativeFallback.name(),
        "Ticks answered with the conservative output"
    );
    ::metrics::describe_counter!(
        CounterMetric::ParticleReset.name(),
        "Particle population resets"
    );
    ::metrics::describe_counter!(CounterMetric::RejectedInput.name(), "Rejected inputs");
    ::metrics::describe_counter!(
        CounterMetric::HealthTransition.name(),
        "Health state transitions"
    );
}
