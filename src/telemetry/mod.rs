//! Telemetry module
//!
//! Logging and metrics for host applications

mod logging;
mod metrics;

pub use logging::{init_logging, LogFormat};
pub use self::metrics::{describe_metrics, increment_counter, set_gauge, CounterMetric, GaugeMetric};

use crate::config::TelemetryConfig;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Handle to the initialized telemetry stack
pub struct TelemetryGuard {
    prometheus: Option<PrometheusHandle>,
}

impl TelemetryGuard {
    /// Render the Prometheus registry, if metrics are enabled
    pub fn render_metrics(&self) -> Option<String> {
        self.prometheus.as_ref().map(PrometheusHandle::render)
    }
}

/// Initialize all telemetry subsystems
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<TelemetryGuard> {
    init_logging(&config.log_level, config.log_format)?;

    let prometheus = if config.metrics_enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("Failed to install metrics recorder: {}", e))?;
        describe_metrics();
        Some(handle)
    } else {
        None
    };

    Ok(TelemetryGuard { prometheus })
}
