//! Extraction of HOTA, MOTA and IDF1 from the evaluation report.
//!
//! The report holds one summary row per metric family, each introduced by the
//! `COMBINED` marker (the row aggregated across sequences). The text after
//! each marker occurrence, up to the next one, is a segment. The final segment
//! is dropped, and the first standalone number in each of the next three
//! segments is HOTA, MOTA and IDF1 in that order.

use evo_types::{ReportError, Scores, OBJECTIVE_COUNT};
use regex::Regex;
use std::sync::LazyLock;

/// Marker that introduces a combined-across-sequences summary row.
pub const COMBINED_MARKER: &str = "COMBINED";

#[derive(Debug, Clone, PartialEq)]
pub struct ReportFormat {
    pub marker: String,
    /// Marker occurrences to ignore at the start of the report.
    pub skip_leading: usize,
    /// Marker occurrences to ignore at the end of the report.
    pub drop_trailing: usize,
}

impl Default for ReportFormat {
    fn default() -> Self {
        Self {
            marker: COMBINED_MARKER.to_string(),
            skip_leading: 0,
            drop_trailing: 1,
        }
    }
}

impl ReportFormat {
    pub fn parse(&self, report: &str) -> Result<Scores, ReportError> {
        let segments: Vec<&str> = report.split(self.marker.as_str()).skip(1).collect();
        if segments.is_empty() {
            return Err(ReportError::MarkerMissing {
                marker: self.marker.clone(),
            });
        }

        let end = segments.len().saturating_sub(self.drop_trailing);
        let start = self.skip_leading.min(end);
        let kept = &segments[start..end];
        if kept.len() < OBJECTIVE_COUNT {
            return Err(ReportError::TooFewMetrics {
                expected: OBJECTIVE_COUNT,
                found: kept.len(),
            });
        }

        let mut values = [0.0; OBJECTIVE_COUNT];
        for (i, segment) in kept.iter().take(OBJECTIVE_COUNT).enumerate() {
            values[i] = first_number(segment).ok_or(ReportError::NoMetric { index: start + i })?;
        }
        Ok(Scores::new(values[0], values[1], values[2]))
    }
}

/// Parse a report with the default `COMBINED` layout.
pub fn parse_combined_metrics(report: &str) -> Result<Scores, ReportError> {
    ReportFormat::default().parse(report)
}

/// A float or int token not preceded by a word character, so the `1` of
/// `IDF1` never matches. A directly preceding sign is kept.
static METRIC_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w])([-+]?\d*\.?\d+)").expect("metric number pattern is valid")
});

/// First standalone number in `segment`, e.g. `58.7` in `IDF1: 58.7`.
fn first_number(segment: &str) -> Option<f64> {
    METRIC_NUMBER
        .captures(segment)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
