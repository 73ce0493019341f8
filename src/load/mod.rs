//! Load Generation Module
//!
//! Drives synthetic HTTP traffic at the target during the peak phase.

pub mod generator;

pub use generator::{LoadGenerator, LoadStats, LoadTarget, REQUEST_TIMEOUT, WARMUP_DELAY};
