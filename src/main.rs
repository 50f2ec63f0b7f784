use anyhow::Result;
use clap::Parser;

use gdownload::cli::Cli;
use gdownload::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_cli(cli);
    setup_logging(config.debug);

    let totals = gdownload::run(&config)?;
    println!(
        "{} messages, {} attachments",
        totals.messages, totals.attachments
    );
    Ok(())
}

/// Set up tracing on stderr; `RUST_LOG` overrides the default level.
fn setup_logging(debug: bool) {
    let level = if debug { "info,gdownload=debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
