//! `awcms` administration binary.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose > 1)
        .with_writer(std::io::stderr)
        .init();

    let code = match cli.execute().await {
        Ok(()) => 0,
        Err(e) => {
            output::print_error(&e.to_string());
            1
        }
    };
    std::process::exit(code);
}
