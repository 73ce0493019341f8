//! Error Types
//!
//! One error enum per concern. Only configuration and process-control
//! failures abort a run; everything else is logged where it happens.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Exit code for missing or invalid configuration.
pub const EXIT_CONFIG: u8 = 1;

/// Exit code when the target cannot be launched or measured.
pub const EXIT_RUNTIME: u8 = 2;

/// Exit code when a running target cannot be stopped.
pub const EXIT_FATAL: u8 = 3;

/// Invalid or incomplete command-line configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("need at least the target program to proceed")]
    MissingTarget,

    #[error("invalid API endpoint '{endpoint}': {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
}

/// Failures while controlling the measured child process.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("can't launch {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("can't stop process {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("can't wait for process {pid}: {source}")]
    Wait {
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("process harness exited without handing over a snapshot")]
    HandoffDropped,
}

/// Failures while preparing the load generator.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("can't build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Failures while writing findings. Never abort a run.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("can't serialize findings: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("can't export findings: {0}")]
    Write(#[from] io::Error),

    #[error("unknown output format '{0}', please use json or openmetrics")]
    UnknownFormat(String),
}

/// Top-level failure of an assessment run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Harness(#[from] HarnessError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl RunError {
    /// Returns true if the run must terminate without any cleanup.
    ///
    /// A child that cannot be signalled may never exit, so waiting for
    /// its harness thread would hang the tool.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RunError::Harness(HarnessError::Signal { .. }))
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Config(_) => EXIT_CONFIG,
            _ if self.is_fatal() => EXIT_FATAL,
            RunError::Harness(_) | RunError::Load(_) => EXIT_RUNTIME,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_error_is_fatal() {
        let err = RunError::from(HarnessError::Signal {
            pid: 42,
            source: io::Error::from_raw_os_error(libc::EPERM),
        });
        assert!(err.is_fatal());
        assert_eq!(err.exit_code(), EXIT_FATAL);
        assert!(err.to_string().contains("can't stop process 42"));
    }

    #[test]
    fn test_spawn_error_is_not_fatal() {
        let err = RunError::from(HarnessError::Spawn {
            path: PathBuf::from("/no/such/binary"),
            source: io::Error::from(io::ErrorKind::NotFound),
        });
        assert!(!err.is_fatal());
        assert_eq!(err.exit_code(), EXIT_RUNTIME);
        assert!(err.to_string().contains("/no/such/binary"));
    }

    #[test]
    fn test_config_error_exit_code() {
        let err = RunError::from(ConfigError::MissingTarget);
        assert_eq!(err.exit_code(), EXIT_CONFIG);
    }

    #[test]
    fn test_unknown_format_message() {
        let err = ExportError::UnknownFormat("yaml".to_string());
        assert!(err.to_string().contains("'yaml'"));
    }
}
