use clap::Parser;
use p2p_rates::cli::{config_summary, Cli, Commands};
use p2p_rates::config::{Config, Secrets};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using bundled configuration");
            Config::bundled()?
        }
    };

    // Initialize telemetry
    let _telemetry = p2p_rates::telemetry::init_telemetry(&config.telemetry)?;
    let secrets = Secrets::from_env();
    tracing::debug!(?secrets, "Loaded secrets");

    match cli.command {
        Commands::Run(args) => {
            tracing::info!(mode = ?config.delivery.mode, "Starting rate bot");
            args.execute(config, secrets).await?;
        }
        Commands::Snapshot(args) => {
            args.execute(config, secrets).await?;
        }
        Commands::Config => {
            println!("{}", config_summary(&config));
        }
    }

    Ok(())
}
