//! Text summary builder for CLI output.
//!
//! Formats a completed results payload into human-readable lines: the
//! normalized tag table ordered by frequency, then the per-tag syntheses.

use crate::model::AnalysisResults;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Build a text summary from a completed results payload.
pub(crate) fn build_text_summary(results: &AnalysisResults) -> TextSummary {
    let mut lines = Vec::new();

    if !results.rows.is_empty() {
        lines.push(format!("Responses analyzed: {}", results.rows.len()));
    }
    lines.push(format!("Normalized tags: {}", results.normalized_tags.len()));

    let mut tags: Vec<(&String, &u64)> = results.normalized_tags.iter().collect();
    tags.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (tag, count) in &tags {
        lines.push(format!("  {:<28} {:>5}", tag, count));
    }

    for (tag, _) in &tags {
        if let Some(summary) = results.summaries.get(*tag) {
            lines.push(String::new());
            lines.push(format!("— {tag}"));
            lines.push(summary.clone());
        }
    }

    TextSummary { lines }
}
