//! neudev-terminal - run a program on the NEUDev backend and turn its output
//! into a test case.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use neudev_core::{
    ItemDraft, RunOutcome, TerminalCommand, TerminalDriver, TerminalHandle, TerminalSession,
    TerminalUpdate, catalog, transport,
};
use neudev_terminal::{config, logging, render::Renderer};
use neudev_types::TestCase;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_stream::{StreamExt, wrappers::LinesStream};

use config::Config;
use logging::{LogConfig, LogFormat};

/// NEUDev terminal - interactive program runs and test-case capture.
#[derive(Parser, Debug)]
#[command(name = "neudev-terminal")]
#[command(about = "Run code on the NEUDev backend and capture its output as a test case")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (INFO level for most targets)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable trace logging (every frame on the wire)
    #[arg(long, global = true)]
    trace: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Set log level for specific targets (e.g., "transport=debug").
    /// Can be specified multiple times. Targets are prefixed with "neudev::" automatically.
    #[arg(long = "log", value_name = "TARGET=LEVEL", global = true)]
    log_overrides: Vec<String>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a source file; lines typed on stdin are sent as program input
    Run {
        /// Source file to run
        file: PathBuf,

        /// Language id, name or compiler code (e.g. 3, Python, py)
        #[arg(short, long)]
        language: String,

        /// Initial input sent with the program
        #[arg(long, default_value = "")]
        input: String,

        /// Override the backend URL from config
        #[arg(long, value_name = "URL")]
        backend_url: Option<String>,

        /// Append the resulting test case to this item draft (JSON)
        #[arg(long, value_name = "FILE")]
        draft: Option<PathBuf>,

        /// Keep the output as a test case even if the run failed
        #[arg(long)]
        accept_errors: bool,
    },
    /// List the supported languages
    Languages,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_cli(
        cli.verbose,
        cli.debug,
        cli.trace,
        cli.quiet,
        cli.log_overrides,
        cli.log_format,
    );
    logging::init(&log_config);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Command::Languages => {
            for lang in catalog::builtin_languages() {
                println!(
                    "{:>3}  {:<8} {}",
                    lang.id,
                    catalog::compiler_code(lang.id).unwrap_or("-"),
                    lang.name
                );
            }
            Ok(())
        }
        Command::Run {
            file,
            language,
            input,
            backend_url,
            draft,
            accept_errors,
        } => {
            if let Some(url) = backend_url {
                config.backend_url = url;
            }
            tracing::info!(
                target: "neudev::startup",
                "Loaded configuration (backend: {})",
                config.backend_url
            );
            run(&config, &file, &language, &input, draft.as_deref(), accept_errors).await
        }
    }
}

async fn run(
    config: &Config,
    file: &Path,
    language: &str,
    input: &str,
    draft_path: Option<&Path>,
    accept_errors: bool,
) -> Result<()> {
    let code = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let languages = catalog::builtin_languages();
    let lang = catalog::find_language(&languages, language)
        .ok_or_else(|| anyhow!("Unknown language '{}'", language))?;
    let request = catalog::prepare_run(lang, &code, input)?;

    let transport = transport::spawn(config.backend_url.clone(), config.connect_timeout());
    let session = TerminalSession::new(config.session_config());
    let (driver, handle) = TerminalDriver::new(session, transport.outbound, transport.events);
    let mut updates = handle.subscribe();
    let driver_task = tokio::spawn(driver.run());

    handle.send(TerminalCommand::Run(request)).await?;

    let mut renderer = Renderer::new(std::io::stdout());
    let mut test_case = None;
    let outcome = watch_run(&handle, &mut updates, &mut renderer, &mut test_case).await?;

    if let RunOutcome::Failed { .. } = &outcome {
        if accept_errors {
            handle.send(TerminalCommand::AcceptErrorOutput).await?;
            test_case = wait_for_test_case(&mut updates).await;
        } else {
            eprintln!("The code encountered an error during execution (use --accept-errors to keep its output)");
        }
    }

    handle.send(TerminalCommand::Shutdown).await?;
    driver_task.await?;

    match outcome {
        RunOutcome::Faulted { reason } => Err(anyhow!(reason)),
        RunOutcome::Cancelled => {
            eprintln!("Run cancelled");
            Ok(())
        }
        RunOutcome::Passed { .. } | RunOutcome::Failed { .. } => {
            match test_case {
                Some(tc) => {
                    println!("{}", serde_json::to_string_pretty(&tc)?);
                    if let Some(path) = draft_path {
                        save_to_draft(path, tc)?;
                    }
                }
                None => eprintln!("Program produced no output; no test case created"),
            }
            Ok(())
        }
    }
}

/// Render updates and forward stdin until the run finishes.
async fn watch_run(
    handle: &TerminalHandle,
    updates: &mut broadcast::Receiver<TerminalUpdate>,
    renderer: &mut Renderer<std::io::Stdout>,
    test_case: &mut Option<TestCase>,
) -> Result<RunOutcome> {
    let mut stdin = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let mut stdin_open = true;

    loop {
        tokio::select! {
            update = updates.recv() => {
                let update = match update {
                    Ok(update) => update,
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(target: "neudev::session", "Renderer lagged, skipped {} updates", n);
                        continue;
                    }
                    Err(RecvError::Closed) => return Err(anyhow!("Terminal stopped unexpectedly")),
                };
                renderer.render(&update)?;
                match update {
                    TerminalUpdate::TestCase(tc) => *test_case = Some(tc),
                    TerminalUpdate::Rejected(reason) => eprintln!("{}", reason),
                    TerminalUpdate::Finished(outcome) => return Ok(outcome),
                    _ => {}
                }
            }
            line = stdin.next(), if stdin_open => {
                match line {
                    Some(Ok(line)) => {
                        handle.send(TerminalCommand::SetInput(line)).await?;
                        handle.send(TerminalCommand::Submit).await?;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(target: "neudev::input", "Failed to read stdin: {}", e);
                        stdin_open = false;
                    }
                    None => stdin_open = false,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                handle.send(TerminalCommand::Cancel).await?;
            }
        }
    }
}

async fn wait_for_test_case(updates: &mut broadcast::Receiver<TerminalUpdate>) -> Option<TestCase> {
    loop {
        match updates.recv().await {
            Ok(TerminalUpdate::TestCase(tc)) => return Some(tc),
            Ok(TerminalUpdate::Rejected(reason)) => {
                eprintln!("{}", reason);
                return None;
            }
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => return None,
        }
    }
}

fn save_to_draft(path: &Path, test_case: TestCase) -> Result<()> {
    let mut draft = ItemDraft::load_or_default(path)?;
    draft.add_test_case(test_case);
    draft.save(path)?;
    tracing::info!(
        target: "neudev::startup",
        "Saved test case {} to {}",
        draft.test_cases.len(),
        path.display()
    );
    Ok(())
}
