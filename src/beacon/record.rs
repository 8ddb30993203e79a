// BeaconBench - C2 Beacon Telemetry Generator
// Outbound record shape (T1071.001 - Application Layer Protocol: Web Protocols)

use crate::beacon::session::{Session, SystemInfo};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker carried in every payload so analysts can tell the traffic apart
/// from a real implant.
pub const BENIGN_MARKER: &str = "PURPLE_TEAM_TEST_ARTIFACT_BENIGN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// First beacon of a session; carries the system descriptor
    Register,
    /// Every subsequent beacon
    Checkin,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Register => write!(f, "register"),
            RecordKind::Checkin => write!(f, "checkin"),
        }
    }
}

/// One outbound beacon unit. Exactly one record exists per sequence number;
/// the kind is a pure function of the sequence (1 = register, rest = checkin).
#[derive(Debug, Clone)]
pub struct BeaconRecord {
    pub seq: u64,
    pub kind: RecordKind,
    pub pending_results: u64,
}

impl BeaconRecord {
    pub fn new(seq: u64, kind: RecordKind, pending_results: u64) -> Self {
        BeaconRecord {
            seq,
            kind,
            pending_results,
        }
    }
}

/// The logical wire shape of a beacon, with session identity merged in.
/// Field names follow the common JS stager profile so existing detection
/// content matches without adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePayload {
    pub id: String,
    pub seq: u64,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub sysinfo: Option<SystemInfo>,
    pub timestamp: String,
    pub pending_results: u64,
    pub note: String,
}

impl WirePayload {
    /// Merge a record with session identity. The system descriptor rides
    /// along only on the registration beacon.
    pub fn from_record(session: &Session, record: &BeaconRecord) -> Self {
        let sysinfo = match record.kind {
            RecordKind::Register => Some(session.sysinfo.clone()),
            RecordKind::Checkin => None,
        };

        WirePayload {
            id: session.implant_id.clone(),
            seq: record.seq,
            kind: record.kind,
            sysinfo,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            pending_results: record.pending_results,
            note: BENIGN_MARKER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BeaconConfig;

    #[test]
    fn test_register_carries_sysinfo() {
        let session = Session::new(BeaconConfig::default()).unwrap();
        let record = BeaconRecord::new(1, RecordKind::Register, 0);
        let payload = WirePayload::from_record(&session, &record);

        assert_eq!(payload.seq, 1);
        assert_eq!(payload.kind, RecordKind::Register);
        assert!(payload.sysinfo.is_some());
        assert_eq!(payload.note, BENIGN_MARKER);
    }

    #[test]
    fn test_checkin_omits_sysinfo() {
        let session = Session::new(BeaconConfig::default()).unwrap();
        let record = BeaconRecord::new(4, RecordKind::Checkin, 2);
        let payload = WirePayload::from_record(&session, &record);

        assert!(payload.sysinfo.is_none());
        assert_eq!(payload.pending_results, 2);

        // serde must drop the field entirely, not emit null
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("sysinfo"));
        assert!(json.contains("\"type\":\"checkin\""));
    }

    #[test]
    fn test_kind_serialization_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&RecordKind::Register).unwrap(),
            "\"register\""
        );
        assert_eq!(
            serde_json::to_string(&RecordKind::Checkin).unwrap(),
            "\"checkin\""
        );
    }
}
