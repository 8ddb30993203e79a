// BeaconBench - C2 Beacon Telemetry Generator
// Per-sequence beacon shaping: record kind and auxiliary channel activation

use crate::beacon::channel::ChannelKind;
use crate::beacon::record::RecordKind;
use serde::{Deserialize, Serialize};

/// What one cycle should look like: the record kind and any auxiliary
/// channels fired after the primary/fallback attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconPlan {
    pub kind: RecordKind,
    pub aux_channels: Vec<ChannelKind>,
}

/// One rule of the activation table: at this sequence number, also fire
/// these channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRule {
    pub seq: u64,
    pub channels: Vec<ChannelKind>,
}

/// Data-driven mapping from beacon position to auxiliary channel
/// activations. Kept as a table rather than branching so a harness can
/// reconfigure which sequence numbers trigger which channels and validate
/// each detection rule in isolation.
///
/// The default models a staged implant: register once, diversify channels
/// early (DoH lookup on the second beacon, pixel exfil on the third), then
/// settle into plain check-ins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequencePlan {
    rules: Vec<SequenceRule>,
}

impl Default for SequencePlan {
    fn default() -> Self {
        SequencePlan {
            rules: vec![
                SequenceRule {
                    seq: 2,
                    channels: vec![ChannelKind::DnsLookup],
                },
                SequenceRule {
                    seq: 3,
                    channels: vec![ChannelKind::PixelBeacon],
                },
            ],
        }
    }
}

impl SequencePlan {
    pub fn new(rules: Vec<SequenceRule>) -> Self {
        SequencePlan { rules }
    }

    /// Pure function of the sequence number and the static table.
    /// The first beacon is always the registration; everything else is a
    /// check-in.
    pub fn plan(&self, seq: u64) -> BeaconPlan {
        let kind = if seq == 1 {
            RecordKind::Register
        } else {
            RecordKind::Checkin
        };

        let aux_channels = self
            .rules
            .iter()
            .filter(|rule| rule.seq == seq)
            .flat_map(|rule| rule.channels.iter().copied())
            .collect();

        BeaconPlan { kind, aux_channels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_only_at_seq_one() {
        let plan = SequencePlan::default();
        for seq in 1..=20u64 {
            let decided = plan.plan(seq);
            if seq == 1 {
                assert_eq!(decided.kind, RecordKind::Register);
            } else {
                assert_eq!(decided.kind, RecordKind::Checkin, "seq {seq}");
            }
        }
    }

    #[test]
    fn test_default_aux_activation_table() {
        let plan = SequencePlan::default();
        assert!(plan.plan(1).aux_channels.is_empty());
        assert_eq!(plan.plan(2).aux_channels, vec![ChannelKind::DnsLookup]);
        assert_eq!(plan.plan(3).aux_channels, vec![ChannelKind::PixelBeacon]);
        assert!(plan.plan(4).aux_channels.is_empty());
        assert!(plan.plan(5).aux_channels.is_empty());
    }

    #[test]
    fn test_reconfigured_table_is_honoured() {
        let plan = SequencePlan::new(vec![SequenceRule {
            seq: 1,
            channels: vec![ChannelKind::PixelBeacon, ChannelKind::DnsLookup],
        }]);
        assert_eq!(
            plan.plan(1).aux_channels,
            vec![ChannelKind::PixelBeacon, ChannelKind::DnsLookup]
        );
        assert!(plan.plan(2).aux_channels.is_empty());
    }

    #[test]
    fn test_plan_table_deserializes_from_config_json() {
        let plan: SequencePlan =
            serde_json::from_str(r#"[{"seq": 4, "channels": ["dns_lookup"]}]"#).unwrap();
        assert_eq!(plan.plan(4).aux_channels, vec![ChannelKind::DnsLookup]);
    }
}
