//! OpenMetrics text exposition.
//!
//! Every metric is a gauge rendered as a HELP line, a TYPE line and one
//! sample line, for example:
//!
//! ```text
//! # HELP idle_memory The idle state memory consumption
//! # TYPE idle_memory gauge
//! idle_memory{target="./server",unit="bytes"} 4096000
//! ```

use crate::measurement::{Findings, ResourceSnapshot};

const MEMORY_UNIT: &str = "bytes";
const CPU_UNIT: &str = "microsec";

/// Renders findings; peak metrics are included only if a peak phase ran.
pub fn render(findings: &Findings, target: &str) -> String {
    let mut out = String::new();
    emit_snapshot(&mut out, "idle", &findings.idle, target);
    if let Some(peak) = &findings.peak {
        emit_snapshot(&mut out, "peak", peak, target);
    }
    out
}

fn emit_snapshot(out: &mut String, phase: &str, snapshot: &ResourceSnapshot, target: &str) {
    emit_metric(
        out,
        &format!("{}_memory", phase),
        "gauge",
        &format!("The {} state memory consumption", phase),
        snapshot.memory_max_rss,
        &[("target", target), ("unit", MEMORY_UNIT)],
    );
    emit_metric(
        out,
        &format!("{}_cpu_user", phase),
        "gauge",
        &format!("The {} state CPU consumption in user land", phase),
        snapshot.cpu_user,
        &[("target", target), ("unit", CPU_UNIT)],
    );
    emit_metric(
        out,
        &format!("{}_cpu_sys", phase),
        "gauge",
        &format!("The {} state CPU consumption in the kernel", phase),
        snapshot.cpu_sys,
        &[("target", target), ("unit", CPU_UNIT)],
    );
}

/// Appends one HELP/TYPE/sample block.
pub fn emit_metric(
    out: &mut String,
    name: &str,
    kind: &str,
    help: &str,
    value: u64,
    labels: &[(&str, &str)],
) {
    out.push_str(&format!("# HELP {} {}\n", name, help));
    out.push_str(&format!("# TYPE {} {}\n", name, kind));

    let labels = labels
        .iter()
        .map(|(key, value)| format!("{}=\"{}\"", key, escape_label_value(value)))
        .collect::<Vec<_>>()
        .join(",");

    if labels.is_empty() {
        out.push_str(&format!("{} {}\n", name, value));
    } else {
        out.push_str(&format!("{}{{{}}} {}\n", name, labels, value));
    }
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn findings(peak: Option<ResourceSnapshot>) -> Findings {
        Findings {
            idle: ResourceSnapshot::new(2_048_000, 1_000, 500),
            peak,
        }
    }

    #[test]
    fn test_idle_only_has_no_peak_metrics() {
        let out = render(&findings(None), "./server");

        assert!(out.contains("idle_memory{"));
        assert!(out.contains("idle_cpu_user{"));
        assert!(out.contains("idle_cpu_sys{"));
        assert!(!out.contains("peak_"));
        assert_eq!(out.lines().count(), 9);
    }

    #[test]
    fn test_peak_metrics_included() {
        let out = render(&findings(Some(ResourceSnapshot::new(8_192_000, 9, 8))), "./server");

        assert!(out.contains("peak_memory{target=\"./server\",unit=\"bytes\"} 8192000\n"));
        assert!(out.contains("peak_cpu_user{target=\"./server\",unit=\"microsec\"} 9\n"));
        assert!(out.contains("peak_cpu_sys{target=\"./server\",unit=\"microsec\"} 8\n"));
        assert_eq!(out.lines().count(), 18);
    }

    #[test]
    fn test_each_block_is_help_type_value() {
        let out = render(&findings(Some(ResourceSnapshot::new(1, 2, 3))), "t");
        let lines: Vec<&str> = out.lines().collect();

        for block in lines.chunks(3) {
            let name = block[0]
                .strip_prefix("# HELP ")
                .and_then(|rest| rest.split(' ').next())
                .unwrap();
            assert_eq!(block[1], format!("# TYPE {} gauge", name));
            assert!(block[2].starts_with(&format!("{}{{", name)));
            assert!(!block[2].contains(",}"));
        }
    }

    #[test]
    fn test_label_values_are_escaped() {
        let mut out = String::new();
        emit_metric(&mut out, "m", "gauge", "help", 1, &[("target", "a\"b\\c\nd")]);
        assert!(out.ends_with("m{target=\"a\\\"b\\\\c\\nd\"} 1\n"));
    }

    #[test]
    fn test_metric_without_labels() {
        let mut out = String::new();
        emit_metric(&mut out, "m", "gauge", "help", 7, &[]);
        assert_eq!(out, "# HELP m help\n# TYPE m gauge\nm 7\n");
    }
}
