//! ReliefMate entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI, load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config), init logger
//!   4. Build provider chain, router and session registry
//!   5. Spawn Ctrl-C → shutdown signal watcher
//!   6. Spawn channels and the report pruner, wait for them to exit

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use reliefmate::comms::{self, AssistantState};
use reliefmate::error::AppError;
use reliefmate::reports::pruner::ReportPruner;
use reliefmate::runtime::{Component, spawn_components};
use reliefmate::session::SessionRegistry;
use reliefmate::{config, logger};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Optional file.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();
    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, args.log_level.is_some())?;

    info!(
        name = %config.assistant.name,
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        interactive = args.interactive,
        "config loaded"
    );

    let sessions = Arc::new(SessionRegistry::new(config.assistant.system_prompt.clone()));
    let state = Arc::new(AssistantState::from_config(&config, sessions.clone()));

    let labels = state.provider_labels();
    if labels.is_empty() {
        info!("no LLM providers available; every reply comes from the fallback rules");
    } else {
        info!(providers = %labels.join(" → "), "provider chain ready");
    }

    let shutdown = CancellationToken::new();

    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
            ctrlc_token.cancel();
        }
    });

    let mut components: Vec<Box<dyn Component>> = comms::channels(&config, state, args.interactive);
    if config.reports.retention_hours > 0 {
        components.push(Box::new(ReportPruner::new(sessions, config.reports.retention_hours)));
    }

    let handle = spawn_components(components, shutdown.clone());
    let result = handle.join().await;

    // A channel that exits on its own (stdin EOF) still stops the rest.
    shutdown.cancel();
    result?;

    if args.interactive {
        println!("Stay safe.");
    }
    Ok(())
}

struct CliArgs {
    log_level: Option<&'static str>,
    interactive: bool,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut interactive = false;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: reliefmate [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -i, --interactive          Run the interactive console");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-i" | "--interactive" => interactive = true,
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            other => eprintln!("warning: ignoring unknown argument '{other}'"),
        }
    }

    CliArgs { log_level: logger::level_for_verbosity(verbosity), interactive, config_path }
}
