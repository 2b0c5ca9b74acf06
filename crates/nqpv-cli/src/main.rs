//! nqpv CLI entry point.

use anyhow::Result;
use clap::Parser;
use nqpv_cli::{commands, Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(log_level))
        .init();

    let config_path = cli.config.as_deref();
    match &cli.command {
        Commands::Verify { input, output } => {
            commands::handle_verify(input, output.as_deref(), config_path, cli.quiet)?;
        }
        Commands::Show { input, path } => {
            commands::handle_show(input, path.as_deref(), config_path, cli.quiet)?;
        }
        Commands::Save { input, var, destination } => {
            commands::handle_save(input, var, destination, config_path, cli.quiet)?;
        }
    }

    Ok(())
}
