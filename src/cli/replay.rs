//! Replay command implementation

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::allocation::StrategyId;
use crate::config::Config;
use crate::control::MetaController;
use crate::telemetry::TelemetryGuard;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// JSON-lines tick file, `-` for stdin
    #[arg(long, default_value = "-")]
    pub input: PathBuf,

    /// Print the Prometheus registry to stderr when done
    #[arg(long)]
    pub metrics: bool,
}

/// One recorded tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    pub market_return: f64,
    pub equity: f64,
    #[serde(default)]
    pub strategy_pnls: BTreeMap<StrategyId, f64>,
}

/// Counts from one replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub ticks: u64,
    pub skipped: u64,
    pub degraded: u64,
}

impl ReplayArgs {
    pub fn execute(&self, config: &Config, telemetry: &TelemetryGuard) -> anyhow::Result<()> {
        let mut controller = MetaController::new(config)?;
        let stdout = io::stdout();
        let mut out = stdout.lock();

        let summary = if self.input.as_os_str() == "-" {
            replay(&mut controller, io::stdin().lock(), &mut out)?
        } else {
            let file = File::open(&self.input)
                .with_context(|| format!("Failed to open {}", self.input.display()))?;
            replay(&mut controller, BufReader::new(file), &mut out)?
        };

        info!(
            ticks = summary.ticks,
            skipped = summary.skipped,
            degraded = summary.degraded,
            "Replay complete"
        );

        if self.metrics {
            match telemetry.render_metrics() {
                Some(rendered) => eprintln!("{rendered}"),
                None => warn!("Metrics requested but telemetry.metrics_enabled is false"),
            }
        }
        Ok(())
    }
}

/// Feed every tick from `reader` through `controller`, writing outputs as JSON lines
///
/// Blank lines are ignored. Malformed lines are logged and skipped.
pub fn replay<R: BufRead, W: Write>(
    controller: &mut MetaController,
    reader: R,
    mut writer: W,
) -> anyhow::Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read tick input")?;
        if line.trim().is_empty() {
            continue;
        }
        let tick: TickRecord = match serde_json::from_str(&line) {
            Ok(tick) => tick,
            Err(e) => {
                warn!(line = index + 1, error = %e, "Skipping malformed tick");
                summary.skipped += 1;
                continue;
            }
        };

        let output = controller.tick(tick.market_return, tick.equity, &tick.strategy_pnls);
        if output.degraded {
            summary.degraded += 1;
        }
        summary.ticks += 1;

        serde_json::to_writer(&mut writer, &output)?;
        writer.write_all(b"\n")?;
    }

    writer.flush()?;
    Ok(summary)
}
