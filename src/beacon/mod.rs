// BeaconBench - C2 Beacon Telemetry Generator
// Beacon subsystem: session identity, payload shaping, delivery channels,
// jittered scheduling and the engine that drives one session end to end.
//
// MITRE ATT&CK: T1071.001 (Web Protocols), T1132 (Data Encoding),
// T1573 (Encrypted Channel)

pub mod channel;
pub mod codec;
pub mod engine;
pub mod record;
pub mod scheduler;
pub mod sequencer;
pub mod session;
