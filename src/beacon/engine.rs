// BeaconBench - C2 Beacon Telemetry Generator
// The beacon engine: one sequential state machine per session that arms,
// sends, waits and re-arms until the configured cap or an external stop.

use crate::beacon::channel::{ChannelKind, ChannelReport, ChannelSet, SendContext};
use crate::beacon::codec;
use crate::beacon::record::{BeaconRecord, RecordKind, WirePayload};
use crate::beacon::scheduler::{
    JitterScheduler, JitterSource, SeededJitter, ThreadRngJitter,
};
use crate::beacon::sequencer::{BeaconPlan, SequencePlan};
use crate::beacon::session::Session;
use crate::config::{BeaconConfig, ConfigError};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Armed,
    Sending,
    Waiting,
    Stopped,
}

/// Everything one cycle produced: the record shape, the channel outcomes
/// and any encoding failure that made the cycle a no-op on the wire.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub seq: u64,
    pub kind: RecordKind,
    pub encoded_len: usize,
    pub pending: u64,
    pub results: Vec<ChannelReport>,
    pub encoding_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub implant_id: String,
    pub cycles: Vec<CycleReport>,
    pub final_seq: u64,
    pub cancelled: bool,
}

/// External stop signal. Honoured at the waiting suspension point without
/// waiting out the remaining delay.
#[derive(Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        let _ = self.tx.send(true);
    }
}

pub struct BeaconEngine {
    session: Session,
    sequencer: SequencePlan,
    scheduler: JitterScheduler,
    channels: ChannelSet,
    state: EngineState,
    seq: u64,
    cancel_rx: watch::Receiver<bool>,
    // Keeps the watch channel alive so changed() cannot error mid-wait
    _cancel_tx: Arc<watch::Sender<bool>>,
}

impl BeaconEngine {
    /// Build a live engine from a validated configuration. All construction
    /// failures (bad config, transport setup) surface here, before any
    /// cycle starts.
    pub fn new(
        config: BeaconConfig,
        seed: Option<u64>,
        dry_run: bool,
    ) -> Result<(Self, StopHandle), ConfigError> {
        let session = Session::new(config)?;

        let channels = if dry_run {
            ChannelSet::dry_run(&session.config)
        } else {
            ChannelSet::build(&session.config)?
        };

        let source: Box<dyn JitterSource> = match seed {
            Some(seed) => Box::new(SeededJitter::new(seed)),
            None => Box::new(ThreadRngJitter),
        };
        let scheduler = JitterScheduler::new(
            session.config.base_interval_ms,
            session.config.jitter_fraction,
            source,
        );

        Ok(Self::assemble(session, channels, scheduler))
    }

    /// Assemble an engine from pre-built parts. Lets tests inject scripted
    /// channels and deterministic schedulers.
    pub fn with_parts(
        session: Session,
        channels: ChannelSet,
        scheduler: JitterScheduler,
    ) -> (Self, StopHandle) {
        Self::assemble(session, channels, scheduler)
    }

    fn assemble(
        session: Session,
        channels: ChannelSet,
        scheduler: JitterScheduler,
    ) -> (Self, StopHandle) {
        let (tx, rx) = watch::channel(false);
        let tx = Arc::new(tx);

        let engine = BeaconEngine {
            sequencer: session.config.sequence_plan.clone(),
            scheduler,
            channels,
            state: EngineState::Idle,
            seq: 0,
            cancel_rx: rx,
            _cancel_tx: tx.clone(),
            session,
        };

        (engine, StopHandle { tx })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Drive the session to completion: exactly max_beacons sending phases
    /// unless cancelled first. Channel and codec failures never terminate
    /// the loop.
    pub async fn run(&mut self) -> SessionReport {
        let max_beacons = self.session.config.max_beacons;
        info!(
            "Beacon session {} starting: {} -> {}ms interval, {}% jitter, {} beacons max",
            self.session.implant_id,
            self.session.config.primary_url,
            self.session.config.base_interval_ms,
            (self.session.config.jitter_fraction * 100.0).round(),
            max_beacons
        );

        let mut cycles = Vec::new();
        let mut cancelled = false;
        // Results the simulated implant failed to hand off; rides along in
        // the next payload as pending_results
        let mut pending: u64 = 0;

        loop {
            self.state = EngineState::Armed;
            self.seq += 1;
            let plan = self.sequencer.plan(self.seq);

            self.state = EngineState::Sending;
            let report = self.send_cycle(self.seq, &plan, pending).await;
            if report.encoding_error.is_none()
                && report
                    .results
                    .iter()
                    .filter(|r| {
                        matches!(r.channel, ChannelKind::Primary | ChannelKind::Fallback)
                    })
                    .all(|r| !r.success)
            {
                pending += 1;
            }
            cycles.push(report);

            self.state = EngineState::Waiting;
            if !JitterScheduler::should_continue(self.seq, max_beacons) {
                info!("Max beacons reached ({max_beacons}). Implant simulation complete.");
                break;
            }

            let delay = self.scheduler.next_delay();
            info!("Next beacon in {}ms (with jitter)", delay.as_millis());

            if self.wait_or_cancel(delay).await {
                info!("Stop signal received while waiting; halting before next beacon");
                cancelled = true;
                break;
            }
        }

        self.state = EngineState::Stopped;
        SessionReport {
            implant_id: self.session.implant_id.clone(),
            cycles,
            final_seq: self.seq,
            cancelled,
        }
    }

    /// Suspend for the given delay. Returns true if the stop signal fired
    /// before the delay elapsed.
    async fn wait_or_cancel(&mut self, delay: std::time::Duration) -> bool {
        let wait = tokio::time::sleep(delay);
        tokio::pin!(wait);

        loop {
            tokio::select! {
                _ = &mut wait => return false,
                result = self.cancel_rx.changed() => {
                    match result {
                        Ok(()) => {
                            if *self.cancel_rx.borrow_and_update() {
                                return true;
                            }
                            continue;
                        }
                        Err(_) => {
                            // All stop handles dropped; wait out the delay
                            wait.as_mut().await;
                            return false;
                        }
                    }
                }
            }
        }
    }

    async fn send_cycle(&self, seq: u64, plan: &BeaconPlan, pending: u64) -> CycleReport {
        let record = BeaconRecord::new(seq, plan.kind, pending);
        let payload = WirePayload::from_record(&self.session, &record);

        let blob = match codec::encode(&payload, self.session.config.encoding) {
            Ok(blob) => blob,
            Err(e) => {
                // Fatal to this cycle only: skip the sends, keep beaconing
                warn!("Beacon #{seq} payload encoding failed, cycle skipped: {e}");
                return CycleReport {
                    seq,
                    kind: plan.kind,
                    encoded_len: 0,
                    pending,
                    results: Vec::new(),
                    encoding_error: Some(e.to_string()),
                };
            }
        };

        let ctx = SendContext {
            implant_id: self.session.implant_id.clone(),
            seq,
        };

        let mut results = Vec::new();

        let primary = self.channels.primary.send(&blob, &ctx).await;
        let primary_failed = !primary.success;
        if primary_failed {
            debug!(
                "Primary channel failed for beacon #{seq}: {}",
                primary.reason.as_deref().unwrap_or("unknown")
            );
        }
        results.push(primary);

        // Exactly one fallback attempt, no retry storm
        if primary_failed {
            results.push(self.channels.fallback.send(&blob, &ctx).await);
        }

        // Auxiliary channels fire regardless of the primary/fallback outcome
        for kind in &plan.aux_channels {
            match self.channels.aux.get(kind) {
                Some(channel) => results.push(channel.send(&blob, &ctx).await),
                None => warn!("Sequence plan names {kind} but no such auxiliary channel exists"),
            }
        }

        info!("Beacon #{seq} sent. Encoded length: {}", blob.len());

        CycleReport {
            seq,
            kind: plan.kind,
            encoded_len: blob.len(),
            pending,
            results,
            encoding_error: None,
        }
    }
}
