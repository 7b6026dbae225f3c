// ABOUTME: CLI entrypoint for granola-sync
// ABOUTME: Sets up logging, obtains a valid token, and runs the sync with exit codes

use clap::Parser;
use granola_sync::{
    api::ApiClient, cli::Cli, storage::Paths, sync::sync_all, token::TokenManager, Error, Result,
};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("granola-sync: [E{}] {}", e.exit_code(), e);
        std::process::exit(e.exit_code());
    }

    if let Err(e) = run(cli) {
        eprintln!("granola-sync: [E{}] {}", e.exit_code(), e);
        std::process::exit(e.exit_code());
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = match &cli.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer)
        .init();

    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    info!("Starting Granola sync process");

    let paths = Paths::new(cli.output_dir)?;
    info!("Output directory set to: {}", paths.output_dir.display());

    if !cli.config.exists() {
        return Err(Error::Config(format!(
            "Credential file '{}' not found. Copy config.json.template and add your refresh_token and client_id",
            cli.config.display()
        )));
    }

    let mut tokens = TokenManager::load(&cli.config).with_token_url(cli.auth_url);
    let token = tokens
        .get_valid_token()
        .ok_or_else(|| Error::Auth("Failed to obtain access token".into()))?;
    info!("Access token obtained successfully");

    let mut client = ApiClient::new(token, Some(cli.api_base))?;
    if cli.no_throttle {
        client = client.disable_throttle();
    } else if let Some((min, max)) = cli.throttle_ms {
        client = client.with_throttle(min, max);
    }

    let report = sync_all(&client, &paths)?;
    if report.failed > 0 {
        info!("{} of {} documents failed", report.failed, report.total);
    }

    Ok(())
}
