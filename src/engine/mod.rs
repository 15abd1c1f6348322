//! Analysis job engine.
//!
//! Owns one job from submission through its terminal state: validates the
//! input, submits `POST /start_analysis`, then polls the progress resource
//! sequentially until the backend reports completion or failure. Step
//! records and classified log lines are emitted as `JobEvent`s for
//! presentation layers.

mod backend;

pub use backend::{AnalysisBackend, HttpBackend};

use crate::classify::classify;
use crate::error::JobError;
use crate::model::{AnalysisResults, JobConfig, JobEvent, JobSource, JobStatus, Step};
use crate::steps::{StepBoard, StepTransition};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub struct AnalysisEngine {
    cfg: JobConfig,
    backend: Arc<dyn AnalysisBackend>,
    source: JobSource,
}

impl AnalysisEngine {
    pub fn new(cfg: JobConfig, backend: Arc<dyn AnalysisBackend>, source: JobSource) -> Self {
        Self {
            cfg,
            backend,
            source,
        }
    }

    /// Run the job to its terminal state.
    ///
    /// The cancellation token is checked before every network request, so
    /// no request is issued after cancellation. Requests are strictly
    /// sequential: one progress poll, a fixed sleep, repeat.
    pub async fn run(
        self,
        event_tx: UnboundedSender<JobEvent>,
        cancel: CancellationToken,
    ) -> Result<AnalysisResults, JobError> {
        self.validate_source().await?;

        let mut board = StepBoard::new();

        if cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        // The overall deadline covers submission too: a backend that accepts
        // the connection but never answers the start request must not hang
        // the job, and cancellation must be able to abandon it.
        let deadline = Instant::now() + self.cfg.job_timeout;
        let submitted = tokio::select! {
            _ = cancel.cancelled() => return Err(JobError::Cancelled),
            res = tokio::time::timeout_at(deadline, self.backend.start_job(&self.source)) => res,
        };
        let started = match submitted {
            Err(_) => {
                let err = JobError::JobTimeout(self.cfg.job_timeout);
                fail_step(&mut board, &event_tx, &err.to_string());
                return Err(err);
            }
            Ok(Err(e)) => {
                // Submission failures leave every step waiting except the
                // first, which carries the error.
                fail_step(&mut board, &event_tx, &e.to_string());
                return Err(e);
            }
            Ok(Ok(started)) => started,
        };
        let _ = event_tx.send(JobEvent::Submitted {
            session_id: started.session_id.clone(),
        });
        emit_transitions(&event_tx, board.advance(Step::DataLoading));

        let mut dispatched_logs = 0usize;

        loop {
            if cancel.is_cancelled() {
                fail_step(&mut board, &event_tx, "cancelled by user");
                return Err(JobError::Cancelled);
            }
            if Instant::now() >= deadline {
                let err = JobError::JobTimeout(self.cfg.job_timeout);
                fail_step(&mut board, &event_tx, &err.to_string());
                return Err(err);
            }

            let poll = tokio::time::timeout(
                self.cfg.poll_timeout,
                self.backend.progress(&started.session_id),
            )
            .await;
            let snapshot = match poll {
                Err(_) => {
                    let err = JobError::PollTimeout(self.cfg.poll_timeout);
                    fail_step(&mut board, &event_tx, &err.to_string());
                    return Err(err);
                }
                Ok(Err(e)) => {
                    fail_step(&mut board, &event_tx, &e.to_string());
                    return Err(e);
                }
                Ok(Ok(snapshot)) => snapshot,
            };

            // The backend resends the full log list; only the new suffix is
            // classified and dispatched.
            for entry in snapshot.logs.iter().skip(dispatched_logs) {
                let (hint, severity) = classify(&entry.message);
                let step = board.attribute_log(hint);
                let _ = event_tx.send(JobEvent::Log {
                    step,
                    severity,
                    message: entry.message.clone(),
                    timestamp: entry.timestamp.clone(),
                });
            }
            dispatched_logs = dispatched_logs.max(snapshot.logs.len());

            // Unknown step names leave the previously active step in place.
            if let Some(step) = snapshot.current_step.as_deref().and_then(Step::parse) {
                emit_transitions(&event_tx, board.advance(step));
            }

            match snapshot.status {
                JobStatus::Completed => match snapshot.results {
                    Some(results) => {
                        if let Some(step) = board.finish() {
                            let _ = event_tx.send(JobEvent::StepCompleted { step });
                        }
                        return Ok(results);
                    }
                    // A completed job without a payload is a broken backend
                    // contract, not an empty result set.
                    None => {
                        let err = JobError::Transport(
                            "completed response carried no results payload".into(),
                        );
                        fail_step(&mut board, &event_tx, &err.to_string());
                        return Err(err);
                    }
                },
                JobStatus::Error => {
                    let message = snapshot
                        .error_message
                        .unwrap_or_else(|| "analysis failed".to_string());
                    fail_step(&mut board, &event_tx, &message);
                    return Err(JobError::Backend(message));
                }
                JobStatus::Pending | JobStatus::Running => {}
            }

            tokio::select! {
                _ = tokio::time::sleep(self.cfg.poll_interval) => {}
                _ = cancel.cancelled() => {}
            }
        }
    }

    /// Reject bad input before any network activity.
    async fn validate_source(&self) -> Result<(), JobError> {
        match &self.source {
            JobSource::TestData => Ok(()),
            JobSource::File(path) => {
                let meta = tokio::fs::metadata(path).await.map_err(|e| {
                    JobError::Input(format!("cannot read {}: {e}", path.display()))
                })?;
                if meta.len() == 0 {
                    return Err(JobError::Input(format!("{} is empty", path.display())));
                }
                Ok(())
            }
        }
    }
}

fn fail_step(board: &mut StepBoard, event_tx: &UnboundedSender<JobEvent>, message: &str) {
    let step = board.fail();
    let _ = event_tx.send(JobEvent::StepFailed {
        step,
        message: message.to_string(),
    });
}

fn emit_transitions(event_tx: &UnboundedSender<JobEvent>, transitions: Vec<StepTransition>) {
    for transition in transitions {
        let _ = event_tx.send(match transition {
            StepTransition::Completed(step) => JobEvent::StepCompleted { step },
            StepTransition::Started(step) => JobEvent::StepStarted { step },
        });
    }
}
