//! Command-Line Configuration
//!
//! Parses flags with clap and validates them into a [`Config`].

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use url::Url;

use crate::error::ConfigError;
use crate::load::LoadTarget;

/// Default idle sampling window in seconds.
pub const DEFAULT_SAMPLETIME_IDLE: u64 = 2;

/// Default peak sampling window in seconds.
pub const DEFAULT_SAMPLETIME_PEAK: u64 = 10;

/// Default pause between load requests in milliseconds.
pub const DEFAULT_DELAY_PEAK: u64 = 10;

/// Default base URL of the target's HTTP API.
pub const DEFAULT_API_BASEURL: &str = "http://127.0.0.1";

/// Raw command-line flags.
#[derive(Debug, Parser)]
#[command(
    name = "rsg",
    version,
    about = "Assess the idle and peak resource usage of a program",
    after_help = "Example usage:\n  rsg --target test/test --api-path /ping --api-port 8080 2>/dev/null"
)]
pub struct Cli {
    /// The filesystem path of the binary or script to assess
    #[arg(long, value_name = "BINARY", value_parser = clap::value_parser!(OsString))]
    pub target: Option<OsString>,

    /// The time in seconds to perform idle resource usage assessment
    #[arg(long, value_name = "TIME_SEC", default_value_t = DEFAULT_SAMPLETIME_IDLE)]
    pub sampletime_idle: u64,

    /// The time in seconds to perform peak resource usage assessment
    #[arg(long, value_name = "TIME_SEC", default_value_t = DEFAULT_SAMPLETIME_PEAK)]
    pub sampletime_peak: u64,

    /// The base URL component of the HTTP API to use for peak resource usage assessment
    #[arg(long, value_name = "URL", default_value = DEFAULT_API_BASEURL)]
    pub api_baseurl: String,

    /// The URL path component of the HTTP API to use for peak resource usage assessment
    #[arg(long, value_name = "HTTP_URL_PATH")]
    pub api_path: Option<String>,

    /// The TCP port of the HTTP API to use for peak resource usage assessment
    #[arg(long, value_name = "HTTP_PORT")]
    pub api_port: Option<u16>,

    /// The time in milliseconds to wait between two consecutive HTTP GET requests
    #[arg(long, value_name = "TIME_MS", default_value_t = DEFAULT_DELAY_PEAK)]
    pub delay_peak: u64,

    /// The filesystem path to export findings to; stdout if not provided
    #[arg(long, value_name = "FILE", value_parser = clap::value_parser!(OsString))]
    pub export_findings: Option<OsString>,

    /// The output format, valid values are 'json' and 'openmetrics'
    #[arg(long, value_name = "FORMAT", default_value = "json")]
    pub output: String,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Arguments passed to the target
    #[arg(last = true, value_name = "ARGS")]
    pub target_args: Vec<OsString>,
}

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub target: PathBuf,
    pub target_args: Vec<OsString>,
    pub idle_duration: Duration,
    pub peak_duration: Duration,
    /// Present only when both API path and port are configured
    pub load: Option<LoadTarget>,
    pub export_path: Option<PathBuf>,
    pub output_format: String,
}

impl Config {
    /// Validates parsed flags.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        // Empty values count as unset.
        let target = non_empty_path(cli.target).ok_or(ConfigError::MissingTarget)?;

        let load = match (non_empty(cli.api_path), cli.api_port) {
            (Some(path), Some(port)) => Some(LoadTarget {
                endpoint: build_endpoint(&cli.api_baseurl, port, &path)?,
                interval: Duration::from_millis(cli.delay_peak),
            }),
            _ => None,
        };

        Ok(Self {
            target,
            target_args: cli.target_args,
            idle_duration: Duration::from_secs(cli.sampletime_idle),
            peak_duration: Duration::from_secs(cli.sampletime_peak),
            load,
            export_path: non_empty_path(cli.export_findings),
            output_format: cli.output,
        })
    }

    /// Returns the target as shown in logs and metric labels.
    pub fn target_label(&self) -> String {
        self.target.display().to_string()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn non_empty_path(value: Option<OsString>) -> Option<PathBuf> {
    value.filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Joins base URL, port and path into the load endpoint.
fn build_endpoint(baseurl: &str, port: u16, path: &str) -> Result<Url, ConfigError> {
    let endpoint = format!("{}:{}{}", baseurl.trim_end_matches('/'), port, path);
    Url::parse(&endpoint).map_err(|source| ConfigError::InvalidEndpoint { endpoint, source })
}
