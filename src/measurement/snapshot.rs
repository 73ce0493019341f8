//! Resource Snapshot
//!
//! The memory and CPU usage of one finished child process, as
//! reported by the operating system at exit.

use serde::{Deserialize, Serialize};

/// Resource usage of a process over its whole lifetime.
///
/// All fields stay zero until the owning process has exited. Memory is
/// always in bytes and CPU times in microseconds, whatever the unit the
/// platform reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Maximum resident set size in bytes
    #[serde(rename = "memory_in_bytes")]
    pub memory_max_rss: u64,
    /// User-mode CPU time in microseconds
    #[serde(rename = "cpuuser_in_usec")]
    pub cpu_user: u64,
    /// Kernel-mode CPU time in microseconds
    #[serde(rename = "cpusys_in_usec")]
    pub cpu_sys: u64,
}

impl ResourceSnapshot {
    /// Creates a snapshot from normalised values.
    pub fn new(memory_max_rss: u64, cpu_user: u64, cpu_sys: u64) -> Self {
        Self {
            memory_max_rss,
            cpu_user,
            cpu_sys,
        }
    }

    /// Returns true if no usage has been recorded.
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// Maximum RSS in kilobytes, for log output.
    pub fn memory_kb(&self) -> u64 {
        self.memory_max_rss / 1000
    }

    /// User CPU time in milliseconds, for log output.
    pub fn cpu_user_ms(&self) -> u64 {
        self.cpu_user / 1000
    }

    /// System CPU time in milliseconds, for log output.
    pub fn cpu_sys_ms(&self) -> u64 {
        self.cpu_sys / 1000
    }

    /// Returns a one-line human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "MEMORY: {}kB CPU: {}ms (user)/{}ms (sys)",
            self.memory_kb(),
            self.cpu_user_ms(),
            self.cpu_sys_ms()
        )
    }
}

/// Snapshots of one assessment run.
///
/// `peak` is `None` when no peak phase was run, which keeps "not
/// measured" apart from "measured as zero".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Findings {
    pub idle: ResourceSnapshot,
    pub peak: Option<ResourceSnapshot>,
}

impl Findings {
    /// Returns the peak snapshot, or zero if the phase did not run.
    pub fn peak_or_zero(&self) -> ResourceSnapshot {
        self.peak.unwrap_or_default()
    }
}
