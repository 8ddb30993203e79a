// BeaconBench - C2 Beacon Telemetry Generator
// Payload encoding (T1132 - Data Encoding)

use crate::beacon::record::WirePayload;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Transport encoding applied over the canonical JSON serialization of a
/// beacon payload. Both modes are reversible; real stagers overwhelmingly
/// use base64, hex exists so mode selection can be exercised end to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    Base64,
    Hex,
}

impl fmt::Display for EncodingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingMode::Base64 => write!(f, "base64"),
            EncodingMode::Hex => write!(f, "hex"),
        }
    }
}

impl FromStr for EncodingMode {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "base64" => Ok(EncodingMode::Base64),
            "hex" => Ok(EncodingMode::Hex),
            other => Err(CodecError::UnsupportedEncoding(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Unsupported encoding mode: '{0}'")]
    UnsupportedEncoding(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Encode a payload into its transport-safe form. Deterministic for
/// identical input apart from the timestamp the caller already fixed.
pub fn encode(payload: &WirePayload, mode: EncodingMode) -> Result<String, CodecError> {
    let json = serde_json::to_vec(payload)?;
    Ok(match mode {
        EncodingMode::Base64 => STANDARD.encode(&json),
        EncodingMode::Hex => json.iter().map(|b| format!("{b:02x}")).collect(),
    })
}

/// Reverse of [`encode`]; used by tests and by harnesses that want to
/// verify what a sensor captured.
pub fn decode(blob: &str, mode: EncodingMode) -> Result<WirePayload, CodecError> {
    let bytes = match mode {
        EncodingMode::Base64 => STANDARD
            .decode(blob)
            .map_err(|e| CodecError::Decode(e.to_string()))?,
        EncodingMode::Hex => {
            if !blob.is_ascii() {
                return Err(CodecError::Decode("non-ASCII hex input".to_string()));
            }
            if blob.len() % 2 != 0 {
                return Err(CodecError::Decode("odd-length hex input".to_string()));
            }
            (0..blob.len())
                .step_by(2)
                .map(|i| {
                    u8::from_str_radix(&blob[i..i + 2], 16)
                        .map_err(|e| CodecError::Decode(e.to_string()))
                })
                .collect::<Result<Vec<u8>, CodecError>>()?
        }
    };

    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beacon::record::{RecordKind, BENIGN_MARKER};

    fn sample_payload() -> WirePayload {
        WirePayload {
            id: "PT-0123456789AB".to_string(),
            seq: 2,
            kind: RecordKind::Checkin,
            sysinfo: None,
            timestamp: "2026-08-30T12:00:00.000Z".to_string(),
            pending_results: 0,
            note: BENIGN_MARKER.to_string(),
        }
    }

    #[test]
    fn test_round_trip_base64() {
        let payload = sample_payload();
        let blob = encode(&payload, EncodingMode::Base64).unwrap();
        assert_eq!(decode(&blob, EncodingMode::Base64).unwrap(), payload);
    }

    #[test]
    fn test_round_trip_hex() {
        let payload = sample_payload();
        let blob = encode(&payload, EncodingMode::Hex).unwrap();
        assert!(blob.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(decode(&blob, EncodingMode::Hex).unwrap(), payload);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let payload = sample_payload();
        assert_eq!(
            encode(&payload, EncodingMode::Base64).unwrap(),
            encode(&payload, EncodingMode::Base64).unwrap()
        );
    }

    #[test]
    fn test_unknown_mode_string_rejected() {
        let err = "rot13".parse::<EncodingMode>().unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedEncoding(_)));
        assert!("base64".parse::<EncodingMode>().is_ok());
        assert!("HEX".parse::<EncodingMode>().is_ok());
    }

    #[test]
    fn test_garbage_input_fails_decode() {
        assert!(decode("!!!not base64!!!", EncodingMode::Base64).is_err());
        assert!(decode("abc", EncodingMode::Hex).is_err());
    }

    #[test]
    fn test_multibyte_hex_input_fails_cleanly() {
        // Even byte length but not splittable at two-byte boundaries;
        // must come back as a decode error, not a slicing panic
        let err = decode("€a", EncodingMode::Hex).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
        assert!(decode("ZZ", EncodingMode::Hex).is_err());
    }
}
