//! Backend HTTP surface for the analysis service.
//!
//! The engine talks to the backend through the `AnalysisBackend` trait so
//! tests can script progress sequences without a server; `HttpBackend` is
//! the reqwest implementation used by the CLI.

use crate::error::JobError;
use crate::model::{JobConfig, JobSource, ProgressSnapshot, StartResponse, StartedJob};
use async_trait::async_trait;

#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Submit a job. The backend answers synchronously with a session id
    /// even though the analysis itself runs asynchronously server-side.
    async fn start_job(&self, source: &JobSource) -> Result<StartedJob, JobError>;

    /// Fetch the current progress snapshot for a running job.
    async fn progress(&self, session_id: &str) -> Result<ProgressSnapshot, JobError>;
}

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(cfg: &JobConfig) -> Result<Self, JobError> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()
            .map_err(|e| JobError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn start_job(&self, source: &JobSource) -> Result<StartedJob, JobError> {
        let url = format!("{}/start_analysis", self.base_url);
        let request = match source {
            JobSource::TestData => self
                .client
                .post(&url)
                .json(&serde_json::json!({ "use_test_data": true })),
            JobSource::File(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| JobError::Input(format!("cannot read {}: {e}", path.display())))?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "responses.csv".to_string());
                let part = reqwest::multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("text/csv")
                    .map_err(|e| JobError::Submission(e.to_string()))?;
                self.client
                    .post(&url)
                    .multipart(reqwest::multipart::Form::new().part("file", part))
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| JobError::Submission(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JobError::Submission(format!("HTTP {status}: {body}")));
        }
        let ack: StartResponse = response
            .json()
            .await
            .map_err(|e| JobError::Submission(format!("malformed start response: {e}")))?;
        if let Some(error) = ack.error {
            return Err(JobError::Submission(error));
        }
        match ack.session_id {
            Some(session_id) => Ok(StartedJob { session_id }),
            None => Err(JobError::Submission(
                "start response carried neither session_id nor error".to_string(),
            )),
        }
    }

    async fn progress(&self, session_id: &str) -> Result<ProgressSnapshot, JobError> {
        let url = format!("{}/analysis_progress/{}", self.base_url, session_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| JobError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(JobError::Transport(format!("HTTP {status}")));
        }
        response
            .json()
            .await
            .map_err(|e| JobError::Transport(format!("malformed progress response: {e}")))
    }
}
