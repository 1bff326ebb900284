//! orchestrator.rs
//!
//! Runs the two generation flows as sequential stage machines on worker
//! threads, reporting progress and results over an event channel. The
//! caller owns the artifact store and applies mutations only when a
//! Ready event arrives; a failed run therefore cannot leave partial
//! state behind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

use uuid::Uuid;

use crate::error::Error;
use crate::github::{is_code_file, FetchRequest, GithubClient};
use crate::llm::client::GenerationClient;
use crate::llm::normalize;
use crate::llm::prompt;

/* ---------- cancellation ---------- */

#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/* ---------- stages ---------- */

/// One phase of an orchestration. Stages run strictly in sequence; a
/// failure short-circuits the rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Prompting,
    Invoking,
    Normalizing,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Fetching => "fetching",
            Stage::Prompting => "prompting",
            Stage::Invoking => "invoking",
            Stage::Normalizing => "normalizing",
        }
    }
}

/* ---------- events ---------- */

#[derive(Clone, Copy, Debug)]
pub enum LogLevel {
    Info,
    Success,
    Warn,
    Error,
}

#[derive(Debug)]
pub enum PipelineEvent {
    Log(LogLevel, String),
    StageStarted(Stage),
    /// Stage-1 result. `epoch` is the store epoch captured at launch;
    /// the store refuses the batch if it was cleared in the meantime.
    SummariesReady { epoch: u64, summaries: Vec<String> },
    /// Stage-2 result, same staleness contract.
    TestCodeReady { epoch: u64, code: String },
    Failed { stage: Stage, error: Error },
    Cancelled,
    Finished,
}

/* ---------- requests ---------- */

#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub paths: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TestCodeRequest {
    pub summary: String,
    pub framework: String,
}

/* ---------- flows ---------- */

/// Stage 1: fetch → prompt → invoke → normalize, appending to the
/// summary set on completion. Validation failures reject synchronously,
/// before any network traffic; everything later arrives as events.
pub fn run_summary_flow(
    github: GithubClient,
    llm: GenerationClient,
    req: SummaryRequest,
    epoch: u64,
    tx: Sender<PipelineEvent>,
    cancel: CancelToken,
) -> Result<(), Error> {
    if req.paths.is_empty() {
        return Err(Error::Validation("no files selected".into()));
    }
    if let Some(bad) = req.paths.iter().find(|p| !is_code_file(p)) {
        return Err(Error::Validation(format!(
            "{bad} is not a recognized source file"
        )));
    }

    thread::spawn(move || {
        let run = run_id();
        let log = |level: LogLevel, msg: String| {
            let _ = tx.send(PipelineEvent::Log(level, format!("[{run}] {msg}")));
        };
        let fail = |stage: Stage, error: Error| {
            let _ = tx.send(PipelineEvent::Log(
                LogLevel::Error,
                format!("[{run}] {} failed: {error}", stage.as_str()),
            ));
            let _ = tx.send(PipelineEvent::Failed { stage, error });
        };

        /* ---------- fetch ---------- */

        let _ = tx.send(PipelineEvent::StageStarted(Stage::Fetching));
        log(
            LogLevel::Info,
            format!(
                "retrieving {} files from {}/{}@{}",
                req.paths.len(),
                req.owner,
                req.repo,
                req.branch
            ),
        );

        let fetch = FetchRequest {
            owner: req.owner.clone(),
            repo: req.repo.clone(),
            branch: req.branch.clone(),
            paths: req.paths.clone(),
        };

        let files = match github.fetch_files(&fetch, &cancel) {
            Ok(files) => files,
            Err(e) => {
                fail(Stage::Fetching, e);
                return;
            }
        };

        if cancel.is_cancelled() {
            let _ = tx.send(PipelineEvent::Cancelled);
            return;
        }

        /* ---------- prompt ---------- */

        let _ = tx.send(PipelineEvent::StageStarted(Stage::Prompting));
        let prompt_text = prompt::build_summary_prompt(&files);

        /* ---------- invoke ---------- */

        let _ = tx.send(PipelineEvent::StageStarted(Stage::Invoking));
        log(LogLevel::Info, "calling generation model".into());

        let raw = match llm.invoke(&prompt_text) {
            Ok(raw) => raw,
            Err(e) => {
                fail(Stage::Invoking, e);
                return;
            }
        };

        if cancel.is_cancelled() {
            let _ = tx.send(PipelineEvent::Cancelled);
            return;
        }

        /* ---------- normalize ---------- */

        let _ = tx.send(PipelineEvent::StageStarted(Stage::Normalizing));
        let summaries = normalize::normalize_summaries(&raw).into_entries();

        log(
            LogLevel::Success,
            format!("{} summaries generated", summaries.len()),
        );
        let _ = tx.send(PipelineEvent::SummariesReady { epoch, summaries });
        let _ = tx.send(PipelineEvent::Finished);
    });

    Ok(())
}

/// Stage 2: prompt → invoke → normalize, replacing the stored test code
/// on completion. Requires a non-empty summary and framework up front.
pub fn run_test_code_flow(
    llm: GenerationClient,
    req: TestCodeRequest,
    epoch: u64,
    tx: Sender<PipelineEvent>,
    cancel: CancelToken,
) -> Result<(), Error> {
    if req.summary.trim().is_empty() {
        return Err(Error::Validation(
            "a summary must be selected before generating test code".into(),
        ));
    }
    if req.framework.trim().is_empty() {
        return Err(Error::Validation("a test framework must be named".into()));
    }

    thread::spawn(move || {
        let run = run_id();
        let log = |level: LogLevel, msg: String| {
            let _ = tx.send(PipelineEvent::Log(level, format!("[{run}] {msg}")));
        };
        let fail = |stage: Stage, error: Error| {
            let _ = tx.send(PipelineEvent::Log(
                LogLevel::Error,
                format!("[{run}] {} failed: {error}", stage.as_str()),
            ));
            let _ = tx.send(PipelineEvent::Failed { stage, error });
        };

        let _ = tx.send(PipelineEvent::StageStarted(Stage::Prompting));
        let prompt_text = prompt::build_test_code_prompt(&req.summary, &req.framework);

        let _ = tx.send(PipelineEvent::StageStarted(Stage::Invoking));
        log(
            LogLevel::Info,
            format!("generating {} test code", req.framework),
        );

        let raw = match llm.invoke(&prompt_text) {
            Ok(raw) => raw,
            Err(e) => {
                fail(Stage::Invoking, e);
                return;
            }
        };

        if cancel.is_cancelled() {
            let _ = tx.send(PipelineEvent::Cancelled);
            return;
        }

        let _ = tx.send(PipelineEvent::StageStarted(Stage::Normalizing));
        let code = normalize::normalize_test_code(&raw);

        log(LogLevel::Success, "test code generated".into());
        let _ = tx.send(PipelineEvent::TestCodeReady { epoch, code });
        let _ = tx.send(PipelineEvent::Finished);
    });

    Ok(())
}

fn run_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}
