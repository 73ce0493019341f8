//! Measurement Module
//!
//! Spawns the target, bounds its runtime, and reads its resource
//! accounting at exit.
//!
//! # Components
//!
//! - [`ResourceSnapshot`]: memory and CPU usage of one finished process
//! - [`ProcessAccounting`]: platform wait/usage/signal primitives
//! - [`ProcessHarness`]: lifecycle of a single child process
//! - [`PhaseOrchestrator`]: idle and peak phase sequencing

pub mod accounting;
pub mod handoff;
pub mod harness;
pub mod phase;
pub mod snapshot;

pub use accounting::{platform_accounting, ExitOutcome, ExitRecord, ProcessAccounting, SignalOutcome};
pub use handoff::{snapshot_handoff, SnapshotReceiver, SnapshotSender};
pub use harness::{ProcessHarness, StopHandle};
pub use phase::{run_assessment, Phase, PhaseOrchestrator};
pub use snapshot::{Findings, ResourceSnapshot};
