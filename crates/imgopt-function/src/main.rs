use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use imgopt_core::{Config, ObjectEvent};
use imgopt_function::server::start_server;
use imgopt_function::{build_processor, router, AppState, EventResponse};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

/// Exit status for an unmodelled fault (sysexits `EX_SOFTWARE`). Not a single
/// bit, so it never reads as an outcome flag.
const EXIT_FAULT: u8 = 70;

#[derive(Parser, Debug)]
#[command(name = "imgopt")]
#[command(version, about = "Optimize images in place when storage objects change")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Accept storage events over HTTP
    Serve {
        /// Port to listen on (defaults to PORT, then 8080)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Process a single event and exit with its outcome code
    Handle {
        /// JSON event file, or `-` for stdin
        #[arg(long, value_name = "FILE", default_value = "-")]
        event: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    imgopt_infra::init_telemetry(config.server.log_json)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    let processor = build_processor(&config)?;

    match cli.command {
        Command::Serve { port } => {
            let state = Arc::new(AppState {
                processor,
                invocation_timeout: config.server.invocation_timeout(),
            });
            start_server(port.unwrap_or(config.server.port), router(state)).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Handle { event } => {
            let event = read_event(&event).await?;
            match processor.handle(&event).await {
                Ok(outcome) => {
                    println!("{}", serde_json::to_string(&EventResponse::from(outcome))?);
                    Ok(ExitCode::from(outcome.exit_code()))
                }
                Err(fault) => {
                    eprintln!("Error: {}", fault);
                    Ok(ExitCode::from(EXIT_FAULT))
                }
            }
        }
    }
}

async fn read_event(path: &Path) -> Result<ObjectEvent> {
    let raw = if path.as_os_str() == "-" {
        let mut raw = String::new();
        tokio::io::stdin()
            .read_to_string(&mut raw)
            .await
            .context("Failed to read event from stdin")?;
        raw
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read event file {}", path.display()))?
    };

    serde_json::from_str(&raw).context("Event is not a valid storage notification")
}
