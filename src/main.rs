//! selfup CLI entry point
//!
//! Parses arguments, sets up logging, runs the command and turns errors
//! into colored messages with suggestions. The exit code is `0` on success,
//! `1` on error, or the exit code of an elevated upgrade child.

use anyhow::Result;
use clap::Parser;
use selfup_cli::cli;
use selfup_cli::core::error::user_friendly_error;
use tracing_subscriber::EnvFilter;

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let config = cli.build_config();
    init_logging(config.log_level.as_deref());

    match cli.execute_with_config(config).await {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
