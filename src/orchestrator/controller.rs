//! Job lifecycle controller.
//!
//! Owns start/cancel orchestration for at most one in-flight analysis job
//! and emits events for presentation layers. Starting while a job runs is
//! rejected rather than queued; two overlapping poll loops must never exist.

use crate::cli::{build_config, build_source, Cli};
use crate::engine::{AnalysisBackend, AnalysisEngine};
use crate::error::JobError;
use crate::model::{AnalysisResults, JobEvent};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

/// Commands emitted by UI layers to control the running job.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Start,
    Cancel,
    Quit,
}

/// Internal handle for a running job task.
struct RunCtx {
    cancel: CancellationToken,
    handle: Option<tokio::task::JoinHandle<Result<AnalysisResults, JobError>>>,
}

/// Spawn a new job and return its control handle.
fn start_run(
    args: &Cli,
    backend: Arc<dyn AnalysisBackend>,
    event_tx: UnboundedSender<JobEvent>,
) -> Result<RunCtx> {
    let cfg = build_config(args);
    let source = build_source(args)?;
    let cancel = CancellationToken::new();
    let engine = AnalysisEngine::new(cfg, backend, source);
    let job_cancel = cancel.clone();
    let handle = tokio::spawn(async move { engine.run(event_tx, job_cancel).await });
    Ok(RunCtx {
        cancel,
        handle: Some(handle),
    })
}

/// Orchestrate jobs based on UI commands and emit events back to
/// presentation layers. The backend is injected so tests can drive the
/// controller without a server.
pub(crate) async fn run_controller(
    args: &Cli,
    backend: Arc<dyn AnalysisBackend>,
    event_tx: UnboundedSender<JobEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut run_ctx: Option<RunCtx> = None;
    let mut quit_pending = false;
    // Cancel watchdog: if a cancel takes too long, emit a status message to
    // keep UI feedback alive.
    let mut cancel_deadline: Option<tokio::time::Instant> = None;
    let mut watchdog = tokio::time::interval(Duration::from_millis(500));

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Start) => {
                        if run_ctx.is_some() {
                            let _ = event_tx.send(JobEvent::Info(
                                "an analysis is already running; cancel it before starting a new one".into(),
                            ));
                        } else {
                            match start_run(args, backend.clone(), event_tx.clone()) {
                                Ok(ctx) => run_ctx = Some(ctx),
                                Err(e) => {
                                    let _ = event_tx.send(JobEvent::Failed {
                                        error: format!("{e:#}"),
                                    });
                                }
                            }
                        }
                    }
                    Some(UiCommand::Cancel) => {
                        if let Some(ctx) = &run_ctx {
                            ctx.cancel.cancel();
                            let _ = event_tx.send(JobEvent::Info("Cancelling…".into()));
                            cancel_deadline =
                                Some(tokio::time::Instant::now() + Duration::from_secs(3));
                        }
                    }
                    Some(UiCommand::Quit) | None => {
                        // Quit waits for the current job to finish so we can
                        // cleanly finalize UI state.
                        quit_pending = true;
                        if let Some(ctx) = &run_ctx {
                            ctx.cancel.cancel();
                        } else {
                            break Ok(());
                        }
                    }
                }
            }
            // Do not take the JoinHandle before this branch wins; otherwise it
            // can be dropped if another select branch is chosen, and we'll
            // never observe completion.
            maybe_done = async {
                if let Some(ctx) = &mut run_ctx {
                    if let Some(h) = ctx.handle.as_mut() {
                        return Some(h.await);
                    }
                }
                futures::future::pending().await
            } => {
                if let Some(join_res) = maybe_done {
                    if let Some(ctx) = &mut run_ctx {
                        ctx.handle.take();
                    }
                    match join_res {
                        Ok(Ok(results)) => {
                            let _ = event_tx.send(JobEvent::Completed {
                                results: Box::new(results),
                            });
                        }
                        Ok(Err(e)) => {
                            let _ = event_tx.send(JobEvent::Failed {
                                error: e.to_string(),
                            });
                        }
                        Err(e) => {
                            let _ = event_tx.send(JobEvent::Failed {
                                error: format!("job task join failed: {e}"),
                            });
                        }
                    }
                    run_ctx = None;
                    cancel_deadline = None;
                    if quit_pending {
                        break Ok(());
                    }
                }
            }
            // If cancel stalls (e.g., a poll in flight), keep the user informed.
            _ = watchdog.tick() => {
                if let Some(deadline) = cancel_deadline {
                    if tokio::time::Instant::now() >= deadline && run_ctx.is_some() {
                        let _ = event_tx.send(JobEvent::Info("Still cancelling…".into()));
                        cancel_deadline = None;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{JobSource, JobStatus, ProgressSnapshot, StartedJob};
    use async_trait::async_trait;
    use clap::Parser;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    /// Backend whose job never finishes: submission succeeds, every poll
    /// reports the first step still running.
    #[derive(Default)]
    struct StallingBackend {
        start_calls: AtomicUsize,
    }

    #[async_trait]
    impl AnalysisBackend for StallingBackend {
        async fn start_job(&self, _source: &JobSource) -> Result<StartedJob, JobError> {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            Ok(StartedJob {
                session_id: "session-1".into(),
            })
        }

        async fn progress(&self, _session_id: &str) -> Result<ProgressSnapshot, JobError> {
            Ok(ProgressSnapshot {
                status: JobStatus::Running,
                current_step: Some("data-loading".to_string()),
                logs: Vec::new(),
                results: None,
                error_message: None,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_while_running_is_rejected() {
        let args = Cli::parse_from(["verbatim-cli", "--test-data"]);
        let backend = Arc::new(StallingBackend::default());
        let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<JobEvent>();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
        let controller = tokio::spawn({
            let args = args.clone();
            let backend = backend.clone();
            async move { run_controller(&args, backend, evt_tx, cmd_rx).await }
        });

        cmd_tx.send(UiCommand::Start).unwrap();
        // Wait for the first job to be in flight.
        loop {
            match evt_rx.recv().await.expect("controller closed early") {
                JobEvent::Submitted { .. } => break,
                _ => {}
            }
        }

        cmd_tx.send(UiCommand::Start).unwrap();
        // The second start must surface a rejection, and nothing else may
        // reach the backend.
        let mut rejected = false;
        for _ in 0..50 {
            match evt_rx.recv().await.expect("controller closed early") {
                JobEvent::Info(message) if message.contains("already running") => {
                    rejected = true;
                    break;
                }
                _ => {}
            }
        }
        assert!(rejected, "second Start was not rejected");
        assert_eq!(backend.start_calls.load(Ordering::SeqCst), 1);

        // The first job is still the one in flight; Quit cancels it and the
        // controller reports exactly one terminal event for it.
        cmd_tx.send(UiCommand::Quit).unwrap();
        let mut terminal_events = 0;
        while let Some(ev) = evt_rx.recv().await {
            if matches!(ev, JobEvent::Completed { .. } | JobEvent::Failed { .. }) {
                terminal_events += 1;
            }
        }
        assert_eq!(terminal_events, 1);
        controller.await.unwrap().unwrap();
    }
}
