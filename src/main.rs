// BeaconBench - C2 Beacon Telemetry Generator
//
// Generates realistic-looking, harmless command-and-control beacon traffic
// against loopback endpoints so proxy, NDR, EDR and SIEM detection rules
// can be exercised in controlled purple team environments.

mod beacon;
mod cli;
mod config;
mod logger;
mod runner;
mod safety;

use clap::Parser;
use cli::{Cli, Commands};
use log::{error, info};
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logger::init_logger(cli.debug);

    info!(
        "Starting BeaconBench v{} - C2 beacon telemetry generator",
        env!("CARGO_PKG_VERSION")
    );

    match run_command(cli).await {
        Ok(_) => {
            info!("BeaconBench v{} completed successfully", env!("CARGO_PKG_VERSION"));
            process::exit(0);
        }
        Err(e) => {
            error!("BeaconBench failed: {e}");
            process::exit(1);
        }
    }
}

async fn run_command(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Run {
            config,
            dry_run,
            interval_ms,
            jitter,
            max_beacons,
            encoding,
            seed,
            allow_external,
        } => {
            let overrides = runner::RunOverrides {
                interval_ms,
                jitter,
                max_beacons,
                encoding,
            };
            runner::run_session(config, overrides, dry_run, seed, allow_external).await
        }
        Commands::Plan {
            config,
            max_beacons,
        } => runner::print_plan(config, max_beacons),
        Commands::ShowConfig { config } => runner::show_config(config),
    }
}
