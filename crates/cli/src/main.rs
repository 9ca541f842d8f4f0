// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! headjack (`hjk`): isolated containers for coding agents, one per branch.

mod commands;
mod exit_error;
mod output;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use hjk_creds::FileSecretStore;
use hjk_engine::{InstanceManager, Settings, StatePaths};
use hjk_exec::SystemExecutor;

use exit_error::ExitError;

#[derive(Parser)]
#[command(
    name = "hjk",
    version,
    about = "Spawn and manage isolated environments for CLI coding agents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create (or reuse) the instance for a branch and open a session
    Run {
        branch: String,
        /// Prompt handed to the agent
        prompt: Option<String>,
        /// Agent to launch (claude, gemini, codex); config default otherwise
        #[arg(long)]
        agent: Option<String>,
        /// Session name (auto-generated otherwise)
        #[arg(long)]
        name: Option<String>,
        /// Container image override
        #[arg(long, visible_alias = "base")]
        image: Option<String>,
        /// Leave the session detached
        #[arg(short = 'd', long)]
        detach: bool,
    },
    /// Open an agent session in an existing instance
    Agent {
        branch: String,
        /// claude, gemini, or codex
        agent: String,
        #[arg(long)]
        prompt: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(short = 'd', long)]
        detach: bool,
    },
    /// Open a shell (or run a command) in an existing instance
    Exec {
        branch: String,
        /// Command to run; the configured shell otherwise
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        cmd: Vec<String>,
        /// Run through the runtime directly, without a mux session
        #[arg(long)]
        no_mux: bool,
        #[arg(long)]
        name: Option<String>,
        #[arg(short = 'd', long)]
        detach: bool,
    },
    /// Attach to a session (most recently used when unspecified)
    Attach {
        branch: Option<String>,
        session: Option<String>,
    },
    /// List instances and their sessions
    #[command(visible_alias = "ls")]
    Ps {
        /// Limit to one branch
        branch: Option<String>,
        /// All repositories, not just the current one
        #[arg(short = 'a', long)]
        all: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show a session's log
    Logs {
        branch: String,
        session: String,
        /// Follow new output
        #[arg(short = 'f', long)]
        follow: bool,
        /// Number of trailing lines (default 100)
        #[arg(short = 'n', long = "lines")]
        lines: Option<usize>,
        /// Print the whole log
        #[arg(long)]
        full: bool,
    },
    /// Kill one session: hjk kill <branch>/<session>
    Kill { target: String },
    /// Stop a branch's container, keeping the worktree
    Stop { branch: String },
    /// Remove the instance: container, worktree, logs, catalog row
    Rm {
        branch: String,
        /// Skip the confirmation prompt
        #[arg(short = 'f', long)]
        force: bool,
    },
    /// Replace a branch's container, keeping the worktree
    Recreate {
        branch: String,
        /// Container image override
        #[arg(long = "base")]
        image: Option<String>,
    },
    /// Capture and store credentials for an agent
    Auth { agent: String },
    /// Get or set configuration
    Config {
        key: Option<String>,
        value: Option<String>,
        /// Open the config file in $EDITOR
        #[arg(long)]
        edit: bool,
    },
    /// Print the version
    Version,
}

fn init_tracing() {
    // Quiet by default; RUST_LOG opts into diagnostics on stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn manager() -> Result<InstanceManager, ExitError> {
    let settings = Settings::load(&StatePaths::config_file())
        .map_err(|e| ExitError::new(1, e.to_string()))?;
    let paths = StatePaths::resolve(&settings);
    let secrets = Box::new(FileSecretStore::new(&paths.secrets));
    Ok(InstanceManager::new(settings, paths, Arc::new(SystemExecutor::new()), secrets))
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let handle = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });
    token
}

async fn dispatch(cli: Cli) -> Result<(), ExitError> {
    match cli.command {
        Command::Version => {
            println!("hjk {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Config { key, value, edit } => commands::config::handle(key, value, edit),
        Command::Auth { agent } => {
            let mgr = manager()?;
            commands::auth::handle(&mgr, &agent)
        }
        command => {
            let mgr = manager()?;
            let cancel = cancel_on_ctrl_c();
            let cwd = std::env::current_dir()
                .map_err(|e| ExitError::new(1, format!("cannot resolve cwd: {e}")))?;
            match command {
                Command::Run { branch, prompt, agent, name, image, detach } => {
                    commands::run::run(
                        &mgr,
                        &cwd,
                        &branch,
                        prompt,
                        agent.as_deref(),
                        name,
                        image.as_deref(),
                        detach,
                        &cancel,
                    )
                    .await
                }
                Command::Agent { branch, agent, prompt, name, detach } => {
                    commands::run::agent(&mgr, &cwd, &branch, &agent, prompt, name, detach, &cancel)
                        .await
                }
                Command::Exec { branch, cmd, no_mux, name, detach } => {
                    commands::run::exec(&mgr, &cwd, &branch, cmd, no_mux, name, detach, &cancel)
                        .await
                }
                Command::Attach { branch, session } => {
                    commands::attach::handle(
                        &mgr,
                        &cwd,
                        branch.as_deref(),
                        session.as_deref(),
                        &cancel,
                    )
                    .await
                }
                Command::Ps { branch, all, json } => {
                    commands::ps::handle(&mgr, &cwd, branch.as_deref(), all, json, &cancel).await
                }
                Command::Logs { branch, session, follow, lines, full } => {
                    commands::logs::handle(
                        &mgr, &cwd, &branch, &session, follow, lines, full, &cancel,
                    )
                    .await
                }
                Command::Kill { target } => {
                    commands::lifecycle::kill(&mgr, &cwd, &target, &cancel).await
                }
                Command::Stop { branch } => {
                    commands::lifecycle::stop(&mgr, &cwd, &branch, &cancel).await
                }
                Command::Rm { branch, force } => {
                    commands::lifecycle::rm(&mgr, &cwd, &branch, force, &cancel).await
                }
                Command::Recreate { branch, image } => {
                    commands::lifecycle::recreate(&mgr, &cwd, &branch, image.as_deref(), &cancel)
                        .await
                }
                // Handled above
                Command::Version | Command::Config { .. } | Command::Auth { .. } => Ok(()),
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("hjk: {}", e.message);
            if let Some(hint) = &e.hint {
                eprintln!("  {}", hint);
            }
            ExitCode::from(e.code.clamp(0, 255) as u8)
        }
    }
}
