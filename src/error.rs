//! Error taxonomy for analysis jobs.
//!
//! Every variant is fatal for the in-flight job; nothing is retried
//! automatically. A new job is a fresh `start`.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    /// Input rejected before any network call (no file selected, empty file).
    #[error("invalid input: {0}")]
    Input(String),

    /// Backend refused to start the job (non-2xx, error body, or the start
    /// request itself failed). The job never received a session id.
    #[error("job submission rejected: {0}")]
    Submission(String),

    /// A progress request failed mid-job (network error or non-2xx).
    #[error("progress request failed: {0}")]
    Transport(String),

    /// Backend reported `status=error`; message is shown verbatim.
    #[error("analysis failed: {0}")]
    Backend(String),

    /// A single progress poll got no response within the configured bound.
    #[error("no progress response within {0:?}")]
    PollTimeout(Duration),

    /// The job as a whole exceeded its deadline.
    #[error("job did not finish within {0:?}")]
    JobTimeout(Duration),

    /// Cancellation was requested; no further requests were issued.
    #[error("job cancelled")]
    Cancelled,
}
