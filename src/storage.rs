//! Local archive and exports for completed result payloads.
//!
//! Completed runs are auto-saved as JSON under the platform data dir so a
//! job's output survives the terminal session. Exports write the normalized
//! tag table to user-chosen paths.

use crate::model::AnalysisResults;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use time::macros::format_description;

fn runs_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().context("no platform data directory available")?;
    Ok(base.join("verbatim-cli").join("runs"))
}

/// Save a completed run as pretty JSON; returns the written path.
pub fn save_results(results: &AnalysisResults) -> Result<PathBuf> {
    let dir = runs_dir()?;
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let stamp = time::OffsetDateTime::now_utc()
        .format(format_description!(
            "[year][month][day]-[hour][minute][second]"
        ))
        .context("formatting run timestamp")?;
    let path = dir.join(format!("run-{stamp}.json"));
    let body = serde_json::to_string_pretty(results)?;
    fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Export the full results payload as JSON.
pub fn export_json(path: &Path, results: &AnalysisResults) -> Result<()> {
    let body = serde_json::to_string_pretty(results)?;
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Export the normalized tag table (tag, count, summary) as CSV.
pub fn export_csv(path: &Path, results: &AnalysisResults) -> Result<()> {
    let mut out = String::from("tag,count,summary\n");
    for (tag, count) in &results.normalized_tags {
        let summary = results.summaries.get(tag).map(String::as_str).unwrap_or("");
        out.push_str(&format!(
            "{},{},{}\n",
            csv_field(tag),
            count,
            csv_field(summary)
        ));
    }
    fs::write(path, out).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Quote a CSV field when it contains a delimiter, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
