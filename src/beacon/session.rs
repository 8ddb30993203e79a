// BeaconBench - C2 Beacon Telemetry Generator
// Session identity and host descriptor collection

use crate::config::{BeaconConfig, ConfigError};
use chrono::{DateTime, Utc};
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// System descriptor sent in the registration beacon. Everything here is
/// either a real host fact that an implant would harvest or an obviously
/// synthetic stand-in (internal_ip, domain), so the record looks right to
/// detection content without disclosing anything sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub hostname: String,
    pub os: String,
    pub user: String,
    pub pid: u32,
    pub arch: String,
    pub integrity: String,
    pub domain: String,
    pub internal_ip: String,
    pub implant_version: String,
}

impl SystemInfo {
    pub fn collect() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "PURPLETEAM-WORKSTATION".to_string());

        SystemInfo {
            hostname,
            os: std::env::consts::OS.to_string(),
            user: whoami::username(),
            pid: std::process::id(),
            arch: std::env::consts::ARCH.to_string(),
            integrity: "medium".to_string(),
            domain: "PURPLETEAM.LOCAL".to_string(),
            internal_ip: format!("10.0.0.{}", thread_rng().gen_range(1..=254)),
            implant_version: format!("{}-purple-test", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Identity of one bounded beacon run. Constructed once at engine start,
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Session {
    pub implant_id: String,
    pub created_at: DateTime<Utc>,
    pub config: BeaconConfig,
    pub sysinfo: SystemInfo,
}

impl Session {
    /// Validates the configuration and snapshots it. The only hard-error
    /// path in the whole subsystem: misconfiguration surfaces here, before
    /// any cycle runs.
    pub fn new(config: BeaconConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Session {
            implant_id: generate_implant_id(),
            created_at: Utc::now(),
            config,
            sysinfo: SystemInfo::collect(),
        })
    }
}

/// Implant IDs follow the `PT-` + 12 uppercase hex characters profile used
/// by the purple team exercise scripts.
fn generate_implant_id() -> String {
    let raw = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("PT-{}", &raw[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implant_id_format() {
        let id = generate_implant_id();
        assert!(id.starts_with("PT-"));
        assert_eq!(id.len(), 15);
        assert!(id[3..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_implant_ids_are_unique() {
        assert_ne!(generate_implant_id(), generate_implant_id());
    }

    #[test]
    fn test_session_rejects_invalid_config() {
        let config = BeaconConfig {
            jitter_fraction: 2.0,
            ..Default::default()
        };
        assert!(Session::new(config).is_err());
    }

    #[test]
    fn test_sysinfo_internal_ip_is_synthetic() {
        let info = SystemInfo::collect();
        assert!(info.internal_ip.starts_with("10.0.0."));
        assert_eq!(info.domain, "PURPLETEAM.LOCAL");
    }
}
