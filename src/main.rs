mod auth;
mod config;
mod error;
mod github;
mod llm;
mod orchestrator;
mod persistence;
mod store;

use std::error::Error as StdError;
use std::sync::mpsc;

use clap::{Parser, Subcommand};

use crate::github::GithubClient;
use crate::llm::client::GenerationClient;
use crate::orchestrator::{
    run_summary_flow, run_test_code_flow, CancelToken, LogLevel, PipelineEvent, SummaryRequest,
    TestCodeRequest,
};
use crate::store::ArtifactStore;

#[derive(Parser)]
#[command(
    name = "testloom",
    version,
    about = "AI-assisted test case generation from repository source files."
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Save the code-hosting access token
    Login { token: String },
    /// Drop the session and wipe generated artifacts
    Logout,
    /// Store the generative model API key
    Configure {
        #[arg(long)]
        api_key: String,
        /// Override the model endpoint (mainly for gateways)
        #[arg(long)]
        base_url: Option<String>,
    },
    /// List selectable source files in a repository branch
    Files {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        repo: String,
        #[arg(long, default_value = "main")]
        branch: String,
    },
    /// Generate test-case summaries for the selected files
    Summaries {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        repo: String,
        #[arg(long, default_value = "main")]
        branch: String,
        /// Repository paths of the files to summarize
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Expand a stored summary into runnable test code
    Testcode {
        /// Index into the stored summary list (see `show`)
        #[arg(long)]
        summary: usize,
        #[arg(long, default_value = "Jest")]
        framework: String,
    },
    /// Print stored summaries and test code
    Show,
}

fn main() -> Result<(), Box<dyn StdError>> {
    let cli = Cli::parse();

    match cli.command {
        CliCommand::Login { token } => {
            auth::login(&token)?;
            println!("Token saved.");
            Ok(())
        }

        CliCommand::Logout => {
            match auth::logout() {
                Some(session_id) => {
                    persistence::remove(&session_id);
                    println!("Logged out; generated artifacts cleared.");
                }
                None => println!("No active session."),
            }
            Ok(())
        }

        CliCommand::Configure { api_key, base_url } => {
            config::save(&config::Config { api_key, base_url })?;
            println!("Model configuration saved.");
            Ok(())
        }

        CliCommand::Files {
            owner,
            repo,
            branch,
        } => run_files(&owner, &repo, &branch),

        CliCommand::Summaries {
            owner,
            repo,
            branch,
            paths,
        } => run_summaries(owner, repo, branch, paths),

        CliCommand::Testcode { summary, framework } => run_testcode(summary, framework),

        CliCommand::Show => run_show(),
    }
}

fn require_session() -> Result<auth::Session, Box<dyn StdError>> {
    match auth::current() {
        Some(session) => Ok(session),
        None => Err("not logged in; run `testloom login <token>` first".into()),
    }
}

fn generation_client() -> Result<GenerationClient, Box<dyn StdError>> {
    let cfg = config::load();
    Ok(GenerationClient::new(cfg.api_key, cfg.base_url)?)
}

fn run_files(owner: &str, repo: &str, branch: &str) -> Result<(), Box<dyn StdError>> {
    let session = require_session()?;
    let client = GithubClient::new(&session.token)?;

    let files = client.list_code_files(owner, repo, branch)?;
    if files.is_empty() {
        println!("No selectable source files on {owner}/{repo}@{branch}.");
        return Ok(());
    }
    for path in files {
        println!("{path}");
    }
    Ok(())
}

fn run_summaries(
    owner: String,
    repo: String,
    branch: String,
    paths: Vec<String>,
) -> Result<(), Box<dyn StdError>> {
    let session = require_session()?;
    let session_id = session.id();

    let mut store = ArtifactStore::new();
    persistence::load(&mut store, &session_id);

    let github = GithubClient::new(&session.token)?;
    let llm = generation_client()?;

    let (tx, rx) = mpsc::channel();
    run_summary_flow(
        github,
        llm,
        SummaryRequest {
            owner,
            repo,
            branch,
            paths,
        },
        store.epoch(),
        tx,
        CancelToken::new(),
    )?;

    drain_events("summary generation", rx, &mut store, &session_id)
}

fn run_testcode(index: usize, framework: String) -> Result<(), Box<dyn StdError>> {
    let session = require_session()?;
    let session_id = session.id();

    let mut store = ArtifactStore::new();
    persistence::load(&mut store, &session_id);

    let summary = match store.summaries().get(index) {
        Some(s) => s.clone(),
        None => {
            return Err(format!(
                "no stored summary at index {index}; run `testloom show` to list them"
            )
            .into())
        }
    };

    let llm = generation_client()?;

    let (tx, rx) = mpsc::channel();
    run_test_code_flow(
        llm,
        TestCodeRequest { summary, framework },
        store.epoch(),
        tx,
        CancelToken::new(),
    )?;

    drain_events("test code generation", rx, &mut store, &session_id)
}

fn run_show() -> Result<(), Box<dyn StdError>> {
    let session = require_session()?;

    let mut store = ArtifactStore::new();
    persistence::load(&mut store, &session.id());

    if store.summaries().is_empty() {
        println!("No summaries stored.");
    } else {
        println!("Summaries:");
        for (i, summary) in store.summaries().iter().enumerate() {
            println!("  [{i}] {summary}");
        }
    }

    if store.test_code().is_empty() {
        println!("\nNo test code stored.");
    } else {
        println!("\nTest code:\n{}", store.test_code());
    }
    Ok(())
}

/// Drain orchestration events, applying store mutations only on Ready
/// events so a failed run leaves prior artifacts intact.
fn drain_events(
    operation: &str,
    rx: mpsc::Receiver<PipelineEvent>,
    store: &mut ArtifactStore,
    session_id: &str,
) -> Result<(), Box<dyn StdError>> {
    for event in rx {
        match event {
            PipelineEvent::Log(level, msg) => print_log(level, &msg),

            PipelineEvent::StageStarted(stage) => {
                print_log(LogLevel::Info, &format!("stage: {}", stage.as_str()));
            }

            PipelineEvent::SummariesReady { epoch, summaries } => {
                let count = summaries.len();
                if store.append_summaries(epoch, summaries) {
                    persistence::save(store, session_id)?;
                    println!(
                        "Stored {count} new summaries ({} total).",
                        store.summaries().len()
                    );
                } else {
                    print_log(LogLevel::Warn, "stale result dropped; store was cleared");
                }
            }

            PipelineEvent::TestCodeReady { epoch, code } => {
                if store.set_test_code(epoch, code) {
                    persistence::save(store, session_id)?;
                    println!("{}", store.test_code());
                } else {
                    print_log(LogLevel::Warn, "stale result dropped; store was cleared");
                }
            }

            PipelineEvent::Failed { stage, error } => {
                return Err(format!(
                    "{operation} failed at the {} stage: {error}",
                    stage.as_str()
                )
                .into());
            }

            PipelineEvent::Cancelled => {
                print_log(LogLevel::Warn, &format!("{operation} cancelled"));
                return Ok(());
            }

            PipelineEvent::Finished => break,
        }
    }
    Ok(())
}

fn print_log(level: LogLevel, msg: &str) {
    match level {
        LogLevel::Info => println!("  {msg}"),
        LogLevel::Success => println!("+ {msg}"),
        LogLevel::Warn => eprintln!("! {msg}"),
        LogLevel::Error => eprintln!("x {msg}"),
    }
}
