//! JSON findings document.

use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::measurement::{Findings, ResourceSnapshot};

/// On-disk shape of the findings: both keys are always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingsDocument {
    pub idle: ResourceSnapshot,
    pub peak: ResourceSnapshot,
}

impl From<&Findings> for FindingsDocument {
    fn from(findings: &Findings) -> Self {
        Self {
            idle: findings.idle,
            peak: findings.peak_or_zero(),
        }
    }
}

/// Renders findings as pretty-printed JSON.
pub fn render(findings: &Findings) -> Result<String, ExportError> {
    let mut out = serde_json::to_string_pretty(&FindingsDocument::from(findings))?;
    out.push('\n');
    Ok(out)
}

/// Parses a document produced by [`render`].
pub fn parse(data: &str) -> Result<FindingsDocument, ExportError> {
    Ok(serde_json::from_str(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_round_trip() {
        let findings = Findings {
            idle: ResourceSnapshot::new(1_024_000, 3_000, 1_500),
            peak: Some(ResourceSnapshot::new(4_096_000, 90_000, 12_000)),
        };

        let doc = parse(&render(&findings).unwrap()).unwrap();
        assert_eq!(doc.idle, findings.idle);
        assert_eq!(Some(doc.peak), findings.peak);
    }

    #[test]
    fn test_missing_peak_renders_zero() {
        let findings = Findings {
            idle: ResourceSnapshot::new(10, 20, 30),
            peak: None,
        };

        let value: serde_json::Value = serde_json::from_str(&render(&findings).unwrap()).unwrap();
        assert_eq!(value["peak"]["memory_in_bytes"], 0);
        assert_eq!(value["peak"]["cpuuser_in_usec"], 0);
        assert_eq!(value["peak"]["cpusys_in_usec"], 0);
        assert_eq!(value["idle"]["cpusys_in_usec"], 30);
    }

    #[test]
    fn test_render_is_pretty() {
        let out = render(&Findings::default()).unwrap();
        assert!(out.starts_with("{\n"));
        assert!(out.contains("\"idle\": {"));
        assert!(out.ends_with("}\n"));
    }

    #[test]
    fn test_parse_rejects_missing_key() {
        let result = parse(r#"{"idle": {"memory_in_bytes": 1, "cpuuser_in_usec": 1, "cpusys_in_usec": 1}}"#);
        assert!(matches!(result, Err(ExportError::Serialize(_))));
    }
}
