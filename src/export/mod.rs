//! Findings Export Module
//!
//! Formats the idle and peak snapshots and writes them to a file or
//! stdout.
//!
//! - [`json`]: `{"idle": {...}, "peak": {...}}` document
//! - [`openmetrics`]: gauge exposition lines
//! - [`sink`]: file or stdout destination

pub mod json;
pub mod openmetrics;
pub mod sink;

use std::fmt;
use std::path::Path;

use log::info;

use crate::error::ExportError;
use crate::measurement::Findings;

pub use json::FindingsDocument;
pub use sink::Sink;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    OpenMetrics,
}

impl OutputFormat {
    /// Parses a format name, ignoring case.
    pub fn parse(name: &str) -> Result<Self, ExportError> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "openmetrics" => Ok(OutputFormat::OpenMetrics),
            _ => Err(ExportError::UnknownFormat(name.to_string())),
        }
    }

    /// Renders findings in this format.
    pub fn render(&self, findings: &Findings, target: &str) -> Result<String, ExportError> {
        match self {
            OutputFormat::Json => json::render(findings),
            OutputFormat::OpenMetrics => Ok(openmetrics::render(findings, target)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("JSON"),
            OutputFormat::OpenMetrics => f.write_str("OpenMetrics format"),
        }
    }
}

/// Formats `findings` and writes them to `path`, or stdout if unset.
///
/// Nothing is written if the format is unknown or rendering fails.
/// `target` labels the OpenMetrics samples.
pub fn export_findings(
    findings: &Findings,
    target: &str,
    path: Option<&Path>,
    format: &str,
) -> Result<(), ExportError> {
    let format = OutputFormat::parse(format)?;
    let data = format.render(findings, target)?;

    let sink = Sink::from_path(path);
    if let Sink::File(ref file) = sink {
        info!("Exporting findings as {} to {}", format, file.display());
    }
    sink.write(data.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::ResourceSnapshot;
    use tempfile::tempdir;

    fn sample() -> Findings {
        Findings {
            idle: ResourceSnapshot::new(100, 200, 300),
            peak: Some(ResourceSnapshot::new(400, 500, 600)),
        }
    }

    #[test]
    fn test_format_parse_is_case_insensitive() {
        assert_eq!(OutputFormat::parse("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(
            OutputFormat::parse("OpenMetrics").unwrap(),
            OutputFormat::OpenMetrics
        );
        assert!(matches!(
            OutputFormat::parse("yaml"),
            Err(ExportError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_export_json_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("findings.json");

        export_findings(&sample(), "./server", Some(&path), "json").unwrap();

        let doc = json::parse(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc.idle, sample().idle);
        assert_eq!(doc.peak, ResourceSnapshot::new(400, 500, 600));
    }

    #[test]
    fn test_export_openmetrics_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("findings.txt");

        export_findings(&sample(), "./server", Some(&path), "openmetrics").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("idle_memory{target=\"./server\",unit=\"bytes\"} 100"));
        assert!(content.contains("peak_cpu_sys{target=\"./server\",unit=\"microsec\"} 600"));
    }

    #[test]
    fn test_unknown_format_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("findings.out");

        let result = export_findings(&sample(), "./server", Some(&path), "xml");

        assert!(matches!(result, Err(ExportError::UnknownFormat(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope").join("findings.json");

        let result = export_findings(&sample(), "./server", Some(&path), "json");
        assert!(matches!(result, Err(ExportError::Write(_))));
    }
}
