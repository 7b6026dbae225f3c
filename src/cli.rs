// ABOUTME: Command-line interface definitions using clap
// ABOUTME: Output directory, credential file, endpoints, throttling, and logging flags

use crate::api::DEFAULT_API_BASE;
use crate::token::DEFAULT_TOKEN_URL;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "granola-sync")]
#[command(
    about = "Fetch Granola notes and save them as Markdown files in an Obsidian folder",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Folder where notes are saved (must already exist)
    pub output_dir: PathBuf,

    /// Credential file holding refresh_token and client_id
    #[arg(long, env = "GRANOLA_CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    /// API base URL
    #[arg(long, env = "GRANOLA_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// OAuth token endpoint used to refresh the access token
    #[arg(long, env = "GRANOLA_AUTH_URL", default_value = DEFAULT_TOKEN_URL)]
    pub auth_url: String,

    /// Disable throttling (not recommended)
    #[arg(long)]
    pub no_throttle: bool,

    /// Throttle range in ms (min:max)
    #[arg(long, value_parser = parse_throttle_range)]
    pub throttle_ms: Option<(u64, u64)>,

    /// Also append logs to this file
    #[arg(long, env = "GRANOLA_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_throttle_range(s: &str) -> Result<(u64, u64), String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
        return Err("Expected format: min:max".into());
    }

    let min = parts[0].parse().map_err(|_| "Invalid min value")?;
    let max = parts[1].parse().map_err(|_| "Invalid max value")?;

    if min > max {
        return Err("min must be <= max".into());
    }

    Ok((min, max))
}
