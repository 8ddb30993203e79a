// BeaconBench - C2 Beacon Telemetry Generator
// CLI command interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "beaconbench",
    about = "BeaconBench - C2 beacon telemetry generator for detection-rule validation",
    version,
    long_about = "Generates realistic-looking, harmless command-and-control beacon traffic \
against loopback endpoints for purple team exercises. Covers MITRE ATT&CK T1071.001 \
(Web Protocols), T1132 (Data Encoding) and T1573 (Encrypted Channel). No real commands \
are executed and no data leaves the host unless explicitly overridden."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose debug logging
    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one beacon session against the configured endpoints
    Run {
        /// Optional path to a config file (JSON or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Log what would be sent without touching the network
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Base beacon interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Jitter fraction applied to the interval (0.0 - 1.0)
        #[arg(long)]
        jitter: Option<f64>,

        /// Number of beacons to emit before stopping
        #[arg(long)]
        max_beacons: Option<u32>,

        /// Payload encoding mode (base64, hex)
        #[arg(long)]
        encoding: Option<String>,

        /// Seed the jitter source for reproducible timing
        #[arg(long)]
        seed: Option<u64>,

        /// Skip the loopback-only endpoint guard (use with care)
        #[arg(long, default_value_t = false)]
        allow_external: bool,
    },

    /// Print the per-sequence beacon plan without sending anything
    Plan {
        /// Optional path to a config file (JSON or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of beacons to plan for
        #[arg(long)]
        max_beacons: Option<u32>,
    },

    /// Print the effective configuration as pretty JSON
    ShowConfig {
        /// Optional path to a config file (JSON or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
