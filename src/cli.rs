use crate::engine::{AnalysisBackend, HttpBackend};
use crate::model::{AnalysisResults, JobConfig, JobEvent, JobSource, Severity};
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "verbatim-cli",
    version,
    about = "Drive a remote survey-verbatim analysis job and watch its progress"
)]
pub struct Cli {
    /// CSV file of survey responses to upload
    pub file: Option<PathBuf>,

    /// Analyze the backend's built-in sample dataset instead of uploading
    #[arg(long)]
    pub test_data: bool,

    /// Base URL of the analysis backend
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub base_url: String,

    /// Print the raw results payload as JSON and exit
    #[arg(long)]
    pub json: bool,

    /// Run silently: suppress all output except errors (for cron usage)
    #[arg(long)]
    pub silent: bool,

    /// Delay between progress polls
    #[arg(long, default_value = "500ms")]
    pub poll_interval: humantime::Duration,

    /// Timeout for a single progress poll
    #[arg(long, default_value = "10s")]
    pub poll_timeout: humantime::Duration,

    /// Overall deadline for the whole job
    #[arg(long, default_value = "10m")]
    pub job_timeout: humantime::Duration,

    /// Export the results payload as JSON
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Export the normalized tag table as CSV
    #[arg(long)]
    pub export_csv: Option<PathBuf>,

    /// Use --auto-save true or --auto-save false to override
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub auto_save: bool,
}

pub async fn run(args: Cli) -> Result<()> {
    // Validate that --silent can only be used with --json
    if args.silent && !args.json {
        return Err(anyhow::anyhow!(
            "--silent can only be used with --json. Use --silent --json together."
        ));
    }

    // Input problems fail here, before any network activity.
    build_source(&args)?;

    run_job(args).await
}

/// Build a `JobConfig` from CLI arguments.
pub(crate) fn build_config(args: &Cli) -> JobConfig {
    JobConfig {
        base_url: args.base_url.clone(),
        poll_interval: Duration::from(args.poll_interval),
        poll_timeout: Duration::from(args.poll_timeout),
        job_timeout: Duration::from(args.job_timeout),
        user_agent: format!("verbatim-cli/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// Resolve the job input from CLI arguments. Exactly one of the CSV path
/// and `--test-data` must be given.
pub(crate) fn build_source(args: &Cli) -> Result<JobSource> {
    match (&args.file, args.test_data) {
        (Some(_), true) => Err(anyhow::anyhow!(
            "pass either a CSV file or --test-data, not both"
        )),
        (Some(path), false) => Ok(JobSource::File(path.clone())),
        (None, true) => Ok(JobSource::TestData),
        (None, false) => Err(anyhow::anyhow!(
            "no file selected: pass a CSV path or use --test-data"
        )),
    }
}

fn severity_tag(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::InProgress => "....",
        Severity::Success => " ok ",
        Severity::Error => "err!",
    }
}

/// Run one job through the controller and render its event stream.
async fn run_job(args: Cli) -> Result<()> {
    // Progress lines go to stderr in text mode only; json mode keeps stdout
    // machine-readable and silent mode prints nothing at all.
    let quiet = args.silent || args.json;
    let (out_tx, out_handle) = if args.silent {
        (None, None)
    } else {
        let (tx, handle) = spawn_output_writer();
        (Some(tx), Some(handle))
    };
    let emit_err = |line: String| {
        if !quiet {
            if let Some(tx) = out_tx.as_ref() {
                let _ = tx.send(OutputLine::Stderr(line));
            }
        }
    };

    let backend: std::sync::Arc<dyn AnalysisBackend> =
        std::sync::Arc::new(HttpBackend::new(&build_config(&args))?);
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<JobEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
    let controller = tokio::spawn({
        let args = args.clone();
        async move { orchestrator::run_controller(&args, backend, evt_tx, cmd_rx).await }
    });
    cmd_tx
        .send(UiCommand::Start)
        .context("controller unavailable")?;

    // Ctrl-C cancels the in-flight job; the controller then quits once the
    // job reaches its terminal state.
    let ctrl_c_cmd_tx = cmd_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = ctrl_c_cmd_tx.send(UiCommand::Cancel);
        }
    });

    let mut outcome: Option<AnalysisResults> = None;
    let mut failure: Option<String> = None;
    while let Some(ev) = evt_rx.recv().await {
        match ev {
            JobEvent::Submitted { session_id } => {
                emit_err(format!("Job submitted (session {session_id})"));
            }
            JobEvent::StepStarted { step } => {
                emit_err(format!("== {} ==", step.label()));
            }
            JobEvent::StepCompleted { step } => {
                emit_err(format!("{}: completed", step.label()));
            }
            JobEvent::StepFailed { step, message } => {
                emit_err(format!("{} failed: {}", step.label(), message));
            }
            JobEvent::Log {
                severity, message, ..
            } => {
                emit_err(format!("  [{}] {}", severity_tag(severity), message));
            }
            JobEvent::Info(message) => {
                emit_err(message);
            }
            JobEvent::Completed { results } => {
                outcome = Some(*results);
                let _ = cmd_tx.send(UiCommand::Quit);
            }
            JobEvent::Failed { error } => {
                failure = Some(error);
                let _ = cmd_tx.send(UiCommand::Quit);
            }
        }
    }
    controller.await.context("controller task failed")??;

    let finish = match (outcome, failure) {
        (Some(results), _) => {
            let processed = orchestrator::process_job_completion(&args, &results);
            if let Some(tx) = out_tx.as_ref() {
                if args.json {
                    let _ = tx.send(OutputLine::Stdout(serde_json::to_string_pretty(&results)?));
                } else {
                    for line in crate::text_summary::build_text_summary(&results).lines {
                        let _ = tx.send(OutputLine::Stdout(line));
                    }
                }
                if let Some(path) = processed.auto_saved_path {
                    let _ = tx.send(OutputLine::Stderr(format!("Saved: {}", path.display())));
                }
                for message in processed.export_messages {
                    let _ = tx.send(OutputLine::Stderr(message));
                }
            }
            Ok(())
        }
        (None, Some(error)) => Err(anyhow::anyhow!(error)),
        (None, None) => Err(anyhow::anyhow!("controller exited without a job outcome")),
    };

    if let Some(tx) = out_tx {
        drop(tx);
    }
    if let Some(handle) = out_handle {
        let _ = handle.await;
    }

    finish
}
