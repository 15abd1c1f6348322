//! Post-run processing utilities.
//!
//! Handles auto-save and exports after a job completes.

use crate::cli::Cli;
use crate::model::AnalysisResults;
use crate::storage;

/// Result of post-run processing, ready for presentation layers.
pub(crate) struct ProcessedJob {
    pub auto_saved_path: Option<std::path::PathBuf>,
    pub export_messages: Vec<String>,
}

/// Process a completed job: auto-save the payload and run requested exports.
pub(crate) fn process_job_completion(args: &Cli, results: &AnalysisResults) -> ProcessedJob {
    let auto_saved_path = if args.auto_save {
        storage::save_results(results).ok()
    } else {
        None
    };

    let mut export_messages = Vec::new();
    if let Some(export_path) = args.export_json.as_deref() {
        match storage::export_json(export_path, results) {
            Ok(_) => export_messages.push(format!("Exported JSON: {}", export_path.display())),
            Err(e) => export_messages.push(format!("Export JSON failed: {e:#}")),
        }
    }
    if let Some(export_path) = args.export_csv.as_deref() {
        match storage::export_csv(export_path, results) {
            Ok(_) => export_messages.push(format!("Exported CSV: {}", export_path.display())),
            Err(e) => export_messages.push(format!("Export CSV failed: {e:#}")),
        }
    }

    ProcessedJob {
        auto_saved_path,
        export_messages,
    }
}
