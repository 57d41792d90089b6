use adaptive_sizing::cli::{Cli, Commands};
use adaptive_sizing::config::Config;
use anyhow::Context;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration; only a missing file falls back to the defaults
    let config = match Config::load_optional(&cli.config)
        .with_context(|| format!("Invalid configuration in {}", cli.config))?
    {
        Some(config) => config,
        None => {
            eprintln!("Warning: {} not found, using default configuration", cli.config);
            let config: Config = toml::from_str(include_str!("../config.toml.example"))?;
            config.validate()?;
            config
        }
    };

    // Initialize telemetry
    let telemetry = adaptive_sizing::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Replay(args) => {
            tracing::info!(input = %args.input.display(), "Starting replay");
            args.execute(&config, &telemetry)?;
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
