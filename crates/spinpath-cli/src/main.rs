mod cli;
mod commands;
mod error;
mod logging;
mod ui;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    info!("spinpath v{} starting up", env!("CARGO_PKG_VERSION"));
    debug!("full CLI arguments parsed: {:?}", &cli);

    if let Some(num_threads) = cli.threads {
        info!(num_threads, "configuring the global thread pool");
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| CliError::Argument(format!("failed to build thread pool: {e}")))?;
    }

    let result = match cli.command {
        Commands::Relax(args) => commands::relax::run(args),
        Commands::Path(args) => commands::path::run(args),
    };

    match &result {
        Ok(()) => info!("command completed successfully"),
        Err(e) => error!("command failed: {e}"),
    }
    result
}
