#![allow(missing_docs)]

//! NutriPlan — an AI dietitian in the terminal.
//!
//! Single binary that drives a consultation with the configured LLM
//! backend, extracts a validated profile from the conversation, generates
//! and checks a weekly diet plan, and exports it as a document.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use nutriplan::config::{self, Config, OracleBackend};
use nutriplan::dietitian::{Dietitian, DietitianError};
use nutriplan::export::MarkdownRenderer;
use nutriplan::logging;
use nutriplan::providers::{LlmProvider, OllamaProvider, OpenAiProvider, RetryPolicy, RetryingOracle};
use nutriplan::session::SessionStore;

/// NutriPlan — personalized weekly diet plans from a conversation.
#[derive(Parser)]
#[command(name = "nutriplan", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Write a starter nutriplan.toml in the current directory.
    Init,
    /// Start an interactive consultation.
    Start,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials may live in a .env file during development.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    match cli.command {
        Command::Init => handle_init(),
        Command::Start => handle_start().await,
    }
}

/// Write a starter config file, refusing to clobber an existing one.
fn handle_init() -> Result<()> {
    logging::init_cli();

    let path = config::config_path();
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }

    const STARTER: &str = r#"[oracle]
# backend = "openai" | "ollama"
backend = "openai"
model = "gpt-4o-mini"
# base_url = "http://localhost:11434"

[retry]
max_attempts = 3
base_delay_ms = 500

[logging]
logs_dir = "logs"
"#;
    std::fs::write(&path, STARTER)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "starter config written");
    println!("Wrote {}. Set NUTRIPLAN_OPENAI_API_KEY before `nutriplan start`.", path.display());
    Ok(())
}

/// Run the interactive consultation loop.
async fn handle_start() -> Result<()> {
    let path = config::config_path();
    let mut cfg = config::load_or_default(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    config::apply_overrides(&mut cfg, |name| std::env::var(name).ok());

    let _logging_guard = logging::init_session(Path::new(&cfg.logging.logs_dir))?;
    info!(backend = ?cfg.oracle.backend, model = %cfg.oracle.model, "starting consultation");

    let oracle = build_oracle(&cfg)?;
    let dietitian = Dietitian::new(oracle, Arc::new(MarkdownRenderer), SessionStore::new());
    let session = dietitian.start_session();

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(GREETING.as_bytes())
        .await
        .context("failed to write to stdout")?;
    stdout.flush().await.context("failed to flush stdout")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"\nyou> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let output = match parse_command(line) {
            Some(ReplCommand::Quit) => break,
            Some(ReplCommand::Profile) => match dietitian.extract_profile(session).await {
                Ok(profile) => format!(
                    "Profile captured for {} (goal: {}).",
                    profile.name,
                    profile.goal.as_str()
                ),
                Err(e) => describe_error(&e),
            },
            Some(ReplCommand::Plan) => match dietitian.generate_plan(session).await {
                Ok(outcome) => {
                    let mut msg = format!(
                        "Weekly plan ready: {} days, {} kcal total.",
                        outcome.plan.daily_plans.len(),
                        outcome.plan.weekly_summary.total_calories
                    );
                    if !outcome.corrections.is_empty() {
                        msg.push_str(&format!(
                            " ({} totals corrected from meal data)",
                            outcome.corrections.len()
                        ));
                    }
                    msg
                }
                Err(e) => describe_error(&e),
            },
            Some(ReplCommand::Export(target)) => {
                match export_to_file(&dietitian, session, &target).await {
                    Ok(written) => format!("Plan written to {}.", written.display()),
                    Err(e) => format!("export failed: {e}"),
                }
            }
            Some(ReplCommand::Finalize) => match dietitian.finalize(session).await {
                Ok(()) => "Session finalized. You can still /export the plan.".to_owned(),
                Err(e) => describe_error(&e),
            },
            Some(ReplCommand::Reset) => match dietitian.reset(session).await {
                Ok(()) => "Session reset. Let's start over.".to_owned(),
                Err(e) => describe_error(&e),
            },
            Some(ReplCommand::Help) => HELP.to_owned(),
            Some(ReplCommand::Unknown(cmd)) => {
                format!("Unknown command {cmd}. Try /help.")
            }
            None => match dietitian.chat(session, line).await {
                Ok(reply) => reply,
                Err(e) => describe_error(&e),
            },
        };

        stdout.write_all(b"\ndietitian> ").await?;
        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    info!("consultation ended");
    Ok(())
}

const GREETING: &str = "Welcome to NutriPlan. Tell me about yourself and your goals.\n\
                        Type /help for commands.\n";

const HELP: &str = "\
/profile        extract your profile from the conversation\n\
/plan           generate a weekly diet plan from your profile\n\
/export [path]  write the plan to a Markdown file (default: diet_plan.md)\n\
/finalize       close the consultation (export stays available)\n\
/reset          discard everything and start over\n\
/quit           exit";

/// Slash commands understood by the loop.
enum ReplCommand {
    Profile,
    Plan,
    Export(PathBuf),
    Finalize,
    Reset,
    Help,
    Quit,
    Unknown(String),
}

/// Parse a slash command; plain text returns `None` and goes to chat.
fn parse_command(line: &str) -> Option<ReplCommand> {
    if !line.starts_with('/') {
        return None;
    }
    let mut parts = line.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or(line);
    let rest = parts.next().map(str::trim).filter(|s| !s.is_empty());

    Some(match head {
        "/profile" => ReplCommand::Profile,
        "/plan" => ReplCommand::Plan,
        "/export" => {
            ReplCommand::Export(rest.map(PathBuf::from).unwrap_or_else(|| {
                PathBuf::from("diet_plan.md")
            }))
        }
        "/finalize" => ReplCommand::Finalize,
        "/reset" => ReplCommand::Reset,
        "/help" => ReplCommand::Help,
        "/quit" | "/exit" => ReplCommand::Quit,
        other => ReplCommand::Unknown(other.to_owned()),
    })
}

/// Render the plan and write it to disk.
async fn export_to_file(
    dietitian: &Dietitian,
    session: uuid::Uuid,
    target: &Path,
) -> Result<PathBuf> {
    let document = dietitian
        .export(session)
        .await
        .map_err(|e| anyhow::anyhow!(describe_error(&e)))?;

    let mut target = target.to_path_buf();
    if target.extension().is_none() {
        target.set_extension(document.extension);
    }
    tokio::fs::write(&target, &document.bytes)
        .await
        .with_context(|| format!("failed to write {}", target.display()))?;
    Ok(target)
}

/// User-facing rendering of an operation failure.
fn describe_error(err: &DietitianError) -> String {
    match err {
        DietitianError::Guard(g) => format!("Not yet: {g}."),
        other => format!("Something went wrong: {other}"),
    }
}

/// Build the configured oracle, wrapped in retry handling.
fn build_oracle(cfg: &Config) -> Result<Arc<dyn LlmProvider>> {
    let policy = RetryPolicy {
        max_attempts: cfg.retry.max_attempts,
        base_delay: cfg.retry.base_delay(),
    };

    let oracle: Arc<dyn LlmProvider> = match cfg.oracle.backend {
        OracleBackend::Openai => {
            let api_key = cfg
                .oracle
                .api_key
                .clone()
                .context("no API key: set NUTRIPLAN_OPENAI_API_KEY or [oracle].api_key")?;
            let provider = match &cfg.oracle.base_url {
                Some(base) => OpenAiProvider::with_base_url(base, &cfg.oracle.model, api_key),
                None => OpenAiProvider::new(&cfg.oracle.model, api_key),
            };
            Arc::new(RetryingOracle::new(provider, policy))
        }
        OracleBackend::Ollama => {
            let base = cfg
                .oracle
                .base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_owned());
            let provider = OllamaProvider::new(base, &cfg.oracle.model);
            Arc::new(RetryingOracle::new(provider, policy))
        }
    };
    Ok(oracle)
}
