//! rsg - Resource Usage Assessment
//!
//! Measures the peak resident memory and user/system CPU time of an
//! external program, once while idle and once under synthetic HTTP
//! load. Each measurement spawns a fresh child, lets it run for a fixed
//! window, interrupts it with SIGINT and reads its rusage at exit.
//!
//! # Architecture
//!
//! - [`measurement`]: process harness, accounting and phase orchestration
//! - [`load`]: fixed-interval HTTP load generator for the peak phase
//! - [`export`]: JSON and OpenMetrics output
//! - [`config`]: command-line flags and validation
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use rsg::measurement::PhaseOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = PhaseOrchestrator::new("./server");
//!     let findings = orchestrator
//!         .run_assessment(Duration::from_secs(2), None)
//!         .await?;
//!
//!     println!("{}", findings.idle.summary());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod load;
pub mod measurement;

// Re-export commonly used types
pub use config::{Cli, Config};
pub use error::RunError;
pub use export::export_findings;
pub use measurement::{run_assessment, Findings, PhaseOrchestrator, ResourceSnapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "rsg";
