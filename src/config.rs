// BeaconBench - C2 Beacon Telemetry Generator
// Session configuration: endpoints, timing, encoding

use crate::beacon::codec::EncodingMode;
use crate::beacon::sequencer::SequencePlan;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Immutable configuration snapshot for one beacon session.
///
/// Defaults mirror a JS-based C2 stager profile: loopback endpoints on
/// impossible ports, 5 second interval with 20% jitter, five beacons.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    /// Primary task endpoint (POST)
    pub primary_url: String,
    /// Alternate endpoint tried once when the primary fails
    pub fallback_url: String,
    /// DNS-over-HTTPS style lookup endpoint
    pub doh_url: String,
    /// Zone appended to the implant ID for DoH lookups
    pub doh_zone: String,
    /// Pixel/image beacon endpoint (GET, fire-and-forget)
    pub pixel_url: String,
    pub base_interval_ms: u64,
    pub jitter_fraction: f64,
    pub max_beacons: u32,
    pub encoding: EncodingMode,
    /// Per-request timeout for primary/fallback sends
    pub send_timeout_ms: u64,
    pub user_agent: String,
    /// Which sequence numbers trigger which auxiliary channels
    pub sequence_plan: SequencePlan,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        BeaconConfig {
            primary_url: "http://127.0.0.1:65535/api/v1/tasks".to_string(),
            fallback_url: "http://127.0.0.1:65534/api/v1/tasks".to_string(),
            doh_url: "https://127.0.0.1:65535/dns-query".to_string(),
            doh_zone: "c2.purpleteam.test".to_string(),
            pixel_url: "http://127.0.0.1:65535/pixel.gif".to_string(),
            base_interval_ms: 5000,
            jitter_fraction: 0.2,
            max_beacons: 5,
            encoding: EncodingMode::Base64,
            send_timeout_ms: 3000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) PurpleTeamTest/1.0"
                .to_string(),
            sequence_plan: SequencePlan::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(String),
    #[error("base_interval_ms must be positive (got {0})")]
    InvalidInterval(u64),
    #[error("jitter_fraction must be within [0.0, 1.0] (got {0})")]
    InvalidJitter(f64),
    #[error("max_beacons must be at least 1")]
    InvalidMaxBeacons,
    #[error("send_timeout_ms must be positive (got {0})")]
    InvalidTimeout(u64),
    #[error("Unsupported encoding mode: '{0}' (expected base64 or hex)")]
    UnsupportedEncoding(String),
    #[error("Transport setup failed: {0}")]
    Transport(String),
}

impl BeaconConfig {
    /// Validate the configuration before any cycle starts. Violations are
    /// hard errors at session construction time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_interval_ms == 0 {
            return Err(ConfigError::InvalidInterval(self.base_interval_ms));
        }
        if !(0.0..=1.0).contains(&self.jitter_fraction) || !self.jitter_fraction.is_finite() {
            return Err(ConfigError::InvalidJitter(self.jitter_fraction));
        }
        if self.max_beacons == 0 {
            return Err(ConfigError::InvalidMaxBeacons);
        }
        if self.send_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(self.send_timeout_ms));
        }
        Ok(())
    }

    pub fn endpoints(&self) -> Vec<&str> {
        vec![
            self.primary_url.as_str(),
            self.fallback_url.as_str(),
            self.doh_url.as_str(),
            self.pixel_url.as_str(),
        ]
    }
}

/// Load a configuration file, or the defaults when no path is given.
/// Supports both JSON and YAML formats based on file extension.
pub fn load_config(path: Option<&Path>) -> Result<BeaconConfig, ConfigError> {
    match path {
        Some(config_path) => {
            if !config_path.exists() {
                return Err(ConfigError::NotFound(config_path.display().to_string()));
            }

            let contents = fs::read_to_string(config_path)?;

            let path_str = config_path.to_string_lossy();
            let config: BeaconConfig = if path_str.ends_with(".yml") || path_str.ends_with(".yaml")
            {
                serde_yaml::from_str(&contents).map_err(|e| ConfigError::Yaml(e.to_string()))?
            } else {
                serde_json::from_str(&contents)?
            };

            debug!("Loaded configuration from {config_path:?}");
            config.validate()?;
            Ok(config)
        }
        None => {
            debug!("No config file provided, using default configuration");
            Ok(BeaconConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BeaconConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = BeaconConfig {
            base_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidInterval(0))
        ));
    }

    #[test]
    fn test_jitter_out_of_range_rejected() {
        for bad in [-0.1, 1.5, f64::NAN] {
            let config = BeaconConfig {
                jitter_fraction: bad,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "jitter {bad} should be rejected");
        }
    }

    #[test]
    fn test_zero_max_beacons_rejected() {
        let config = BeaconConfig {
            max_beacons: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMaxBeacons)
        ));
    }

    #[test]
    fn test_partial_json_config_fills_defaults() {
        let config: BeaconConfig =
            serde_json::from_str(r#"{"max_beacons": 3, "jitter_fraction": 0.5}"#).unwrap();
        assert_eq!(config.max_beacons, 3);
        assert_eq!(config.jitter_fraction, 0.5);
        assert_eq!(config.base_interval_ms, 5000);
        assert_eq!(config.primary_url, "http://127.0.0.1:65535/api/v1/tasks");
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = BeaconConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let decoded: BeaconConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.primary_url, config.primary_url);
        assert_eq!(decoded.max_beacons, config.max_beacons);
    }
}
