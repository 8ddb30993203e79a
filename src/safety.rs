// BeaconBench - C2 Beacon Telemetry Generator
// Purple team guardrail: keep simulated C2 traffic on the loopback interface

use crate::config::BeaconConfig;
use log::{debug, warn};
use std::net::IpAddr;

/// Check that every configured endpoint points at a loopback host before a
/// live run. The whole point of the harness is to exercise detection rules
/// without any traffic leaving the box.
pub fn check_endpoints(config: &BeaconConfig, allow_external: bool) -> Result<(), String> {
    debug!("Performing endpoint safety checks before execution");

    for endpoint in config.endpoints() {
        if !is_loopback_url(endpoint) {
            if allow_external {
                warn!("Endpoint {endpoint} is not loopback - proceeding (--allow-external)");
                continue;
            }
            return Err(format!(
                "Endpoint {endpoint} does not resolve to a loopback host. \
                 Use --allow-external only in an isolated lab network."
            ));
        }
    }

    debug!("Safety checks passed");
    Ok(())
}

fn is_loopback_url(endpoint: &str) -> bool {
    let url = match reqwest::Url::parse(endpoint) {
        Ok(u) => u,
        Err(_) => return false,
    };

    match url.host_str() {
        Some("localhost") => true,
        Some(host) => {
            // Strip IPv6 brackets before parsing
            let host = host.trim_start_matches('[').trim_end_matches(']');
            host.parse::<IpAddr>()
                .map(|ip| ip.is_loopback())
                .unwrap_or(false)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_hosts_accepted() {
        assert!(is_loopback_url("http://127.0.0.1:65535/api/v1/tasks"));
        assert!(is_loopback_url("http://127.8.4.2/pixel.gif"));
        assert!(is_loopback_url("http://localhost:8080/"));
        assert!(is_loopback_url("https://[::1]/dns-query"));
    }

    #[test]
    fn test_external_hosts_rejected() {
        assert!(!is_loopback_url("http://10.0.0.1/api/v1/tasks"));
        assert!(!is_loopback_url("https://c2.example.com/tasks"));
        assert!(!is_loopback_url("not a url"));
    }

    #[test]
    fn test_default_config_passes_guard() {
        assert!(check_endpoints(&BeaconConfig::default(), false).is_ok());
    }

    #[test]
    fn test_external_endpoint_fails_guard() {
        let config = BeaconConfig {
            primary_url: "http://198.51.100.7/api/v1/tasks".to_string(),
            ..Default::default()
        };
        assert!(check_endpoints(&config, false).is_err());
        assert!(check_endpoints(&config, true).is_ok());
    }
}
