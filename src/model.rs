use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub base_url: String,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub poll_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub job_timeout: Duration,
    pub user_agent: String,
}

/// What the backend should analyze: its built-in sample dataset or an
/// uploaded CSV of survey responses.
#[derive(Debug, Clone)]
pub enum JobSource {
    TestData,
    File(PathBuf),
}

/// The four pipeline stages surfaced to presentation layers, in canonical
/// order. The backend names them with the kebab-case wire strings below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Step {
    DataLoading,
    TagExtraction,
    TagNormalization,
    SynthesisGeneration,
}

impl Step {
    pub const ALL: [Step; 4] = [
        Step::DataLoading,
        Step::TagExtraction,
        Step::TagNormalization,
        Step::SynthesisGeneration,
    ];

    pub fn index(self) -> usize {
        match self {
            Step::DataLoading => 0,
            Step::TagExtraction => 1,
            Step::TagNormalization => 2,
            Step::SynthesisGeneration => 3,
        }
    }

    /// Parse a backend step name. Unknown names yield `None`; callers keep
    /// the previously active step in that case.
    pub fn parse(s: &str) -> Option<Step> {
        match s {
            "data-loading" => Some(Step::DataLoading),
            "tag-extraction" => Some(Step::TagExtraction),
            "tag-normalization" => Some(Step::TagNormalization),
            "synthesis-generation" => Some(Step::SynthesisGeneration),
            _ => None,
        }
    }

    /// Human-readable label for text output.
    pub fn label(self) -> &'static str {
        match self {
            Step::DataLoading => "Data loading",
            Step::TagExtraction => "Tag extraction",
            Step::TagNormalization => "Tag normalization",
            Step::SynthesisGeneration => "Synthesis generation",
        }
    }
}

/// Backend-reported job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Error,
}

/// Derived presentation status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Waiting,
    Active,
    Completed,
    Error,
}

/// One backend log line. Timestamps are opaque backend strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Response body of `POST /start_analysis`.
#[derive(Debug, Clone, Deserialize)]
pub struct StartResponse {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A successfully submitted job, referenced by its backend session id.
#[derive(Debug, Clone)]
pub struct StartedJob {
    pub session_id: String,
}

/// Response body of `GET /analysis_progress/{session_id}`.
///
/// `logs` carries the full log list accumulated so far; the engine tracks
/// how much of it has already been dispatched.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressSnapshot {
    pub status: JobStatus,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub results: Option<AnalysisResults>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Final payload of a completed job. The three structured fields are what
/// the summary and CSV export consume; everything else the backend sends is
/// kept in `extra` so saves and JSON exports stay lossless.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResults {
    #[serde(default)]
    pub normalized_tags: BTreeMap<String, u64>,
    #[serde(default)]
    pub summaries: BTreeMap<String, String>,
    #[serde(default)]
    pub rows: Vec<serde_json::Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Log severity derived from message keywords. Cosmetic only; never feeds
/// back into the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    InProgress,
    Success,
    Error,
}

/// Events emitted by the engine and controller for presentation layers.
#[derive(Debug, Clone, Serialize)]
pub enum JobEvent {
    Submitted {
        session_id: String,
    },
    StepStarted {
        step: Step,
    },
    StepCompleted {
        step: Step,
    },
    StepFailed {
        step: Step,
        message: String,
    },
    Log {
        step: Step,
        severity: Severity,
        message: String,
        timestamp: Option<String>,
    },
    Info(String),
    Completed {
        // Box to keep JobEvent size small; results payloads can be large.
        results: Box<AnalysisResults>,
    },
    Failed {
        error: String,
    },
}
