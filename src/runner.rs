// BeaconBench - C2 Beacon Telemetry Generator
// Command orchestration and console reporting

use crate::beacon::codec::EncodingMode;
use crate::beacon::engine::{BeaconEngine, SessionReport};
use crate::config::{load_config, BeaconConfig};
use crate::safety;
use colored::*;
use log::{error, warn};
use std::path::PathBuf;

/// Optional CLI overrides layered on top of the loaded configuration.
#[derive(Debug, Default)]
pub struct RunOverrides {
    pub interval_ms: Option<u64>,
    pub jitter: Option<f64>,
    pub max_beacons: Option<u32>,
    pub encoding: Option<String>,
}

fn apply_overrides(mut config: BeaconConfig, overrides: RunOverrides) -> Result<BeaconConfig, String> {
    if let Some(interval) = overrides.interval_ms {
        config.base_interval_ms = interval;
    }
    if let Some(jitter) = overrides.jitter {
        config.jitter_fraction = jitter;
    }
    if let Some(max) = overrides.max_beacons {
        config.max_beacons = max;
    }
    if let Some(encoding) = overrides.encoding {
        config.encoding = encoding
            .parse::<EncodingMode>()
            .map_err(|e| e.to_string())?;
    }
    Ok(config)
}

/// Run one beacon session end to end and print the cycle-by-cycle summary.
pub async fn run_session(
    config_path: Option<PathBuf>,
    overrides: RunOverrides,
    dry_run: bool,
    seed: Option<u64>,
    allow_external: bool,
) -> Result<(), String> {
    let config = load_config(config_path.as_deref()).map_err(|e| e.to_string())?;
    let config = apply_overrides(config, overrides)?;

    if dry_run {
        println!("\n{}", "[DRY RUN MODE]".bold().blue());
    } else {
        safety::check_endpoints(&config, allow_external)?;
    }

    let (mut engine, stop_handle) =
        BeaconEngine::new(config, seed, dry_run).map_err(|e| e.to_string())?;

    let session = engine.session();
    println!("\n{}", "Beacon Session".bold().underline());
    println!("{}: {}", "Implant ID".bold(), session.implant_id.yellow());
    println!("{}: {}", "Primary".bold(), session.config.primary_url);
    println!("{}: {}", "Fallback".bold(), session.config.fallback_url);
    println!(
        "{}: {}ms with {}% jitter",
        "Interval".bold(),
        session.config.base_interval_ms,
        (session.config.jitter_fraction * 100.0).round()
    );
    println!("{}: {}", "Max beacons".bold(), session.config.max_beacons);
    println!("{}: {}", "Encoding".bold(), session.config.encoding);

    // Ctrl+C maps onto the engine's stop signal; the wait is the only
    // suspension point so the loop halts before the next beacon
    let ctrl_c_handle = stop_handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received, stopping beacon session");
            ctrl_c_handle.stop();
        }
    });

    println!("\n{}", "Beaconing...".bold());
    let report = engine.run().await;
    print_session_report(&report);

    Ok(())
}

fn print_session_report(report: &SessionReport) {
    println!("\n{}", "Session Summary".bold().underline());
    println!("{}: {}", "Implant ID".bold(), report.implant_id.yellow());

    let mut delivered = 0usize;
    let mut failed = 0usize;

    for cycle in &report.cycles {
        println!(
            "\n{} {} | {} | {} bytes encoded | pending {}",
            "Beacon".bold(),
            format!("#{}", cycle.seq).yellow(),
            cycle.kind,
            cycle.encoded_len,
            cycle.pending
        );

        if let Some(ref reason) = cycle.encoding_error {
            println!("  {} {}", "encoding failed:".red(), reason);
            continue;
        }

        for result in &cycle.results {
            if result.success {
                delivered += 1;
                println!("  {:<13} {}", result.channel.to_string(), "ok".green());
            } else {
                failed += 1;
                println!(
                    "  {:<13} {} ({})",
                    result.channel.to_string(),
                    "failed".red(),
                    result.reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    println!("\n{}", "Totals".bold());
    println!("Cycles: {}", report.cycles.len());
    println!("Channel attempts delivered: {}", delivered.to_string().green());
    println!(
        "Channel attempts failed: {}",
        if failed > 0 {
            failed.to_string().red()
        } else {
            failed.to_string().normal()
        }
    );

    if report.cancelled {
        println!("{}", "Session cancelled by stop signal".yellow().bold());
    } else {
        println!("{}", "Session completed".green().bold());
    }
}

/// Print the per-sequence plan without touching the network.
pub fn print_plan(config_path: Option<PathBuf>, max_beacons: Option<u32>) -> Result<(), String> {
    let mut config = load_config(config_path.as_deref()).map_err(|e| e.to_string())?;
    if let Some(max) = max_beacons {
        config.max_beacons = max;
    }
    config.validate().map_err(|e| e.to_string())?;

    println!("\n{}", "Beacon Sequence Plan".bold().underline());
    println!(
        "{} beacons, {}ms base interval, {}% jitter\n",
        config.max_beacons,
        config.base_interval_ms,
        (config.jitter_fraction * 100.0).round()
    );

    for seq in 1..=config.max_beacons as u64 {
        let plan = config.sequence_plan.plan(seq);
        let aux = if plan.aux_channels.is_empty() {
            "-".to_string()
        } else {
            plan.aux_channels
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!(
            "  {} | {:<8} | aux: {}",
            format!("#{seq}").yellow(),
            plan.kind.to_string(),
            aux
        );
    }

    println!("\nPrimary/fallback fire every beacon; aux channels per the table above.");
    Ok(())
}

/// Print the effective configuration as pretty JSON.
pub fn show_config(config_path: Option<PathBuf>) -> Result<(), String> {
    let config = load_config(config_path.as_deref()).map_err(|e| e.to_string())?;
    match serde_json::to_string_pretty(&config) {
        Ok(json) => {
            println!("{json}");
            Ok(())
        }
        Err(e) => {
            error!("Failed to serialize config: {e}");
            Err(format!("Failed to serialize config: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_config_fields() {
        let overrides = RunOverrides {
            interval_ms: Some(250),
            jitter: Some(0.5),
            max_beacons: Some(9),
            encoding: Some("hex".to_string()),
        };
        let config = apply_overrides(BeaconConfig::default(), overrides).unwrap();
        assert_eq!(config.base_interval_ms, 250);
        assert_eq!(config.jitter_fraction, 0.5);
        assert_eq!(config.max_beacons, 9);
        assert_eq!(config.encoding, EncodingMode::Hex);
    }

    #[test]
    fn test_bad_encoding_override_is_rejected() {
        let overrides = RunOverrides {
            encoding: Some("rot13".to_string()),
            ..Default::default()
        };
        let err = apply_overrides(BeaconConfig::default(), overrides).unwrap_err();
        assert!(err.contains("rot13"));
    }
}
