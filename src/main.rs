use std::path::PathBuf;

use clap::Parser;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use actionforge::config::{self as cfg, LogLevel};
use actionforge::executor::Runtime;
use actionforge::sources;

/// Actionforge CLI
#[derive(Debug, Parser)]
#[command(
    name = actionforge::PKG_NAME,
    version = actionforge::PKG_VERSION,
    about = "Replays W3C WebDriver actions as synthetic desktop input"
)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short = 'c', long = "config", default_value = "config/default.json")]
    config: PathBuf,

    /// Enable dry-run mode (log input events instead of injecting them)
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Set log level (trace, debug, info, warn, error). Overrides RUST_LOG.
    #[arg(long = "log-level")]
    log_level: Option<LogLevel>,

    /// Print the JSON Schema for the configuration and exit
    #[arg(long = "print-schema")]
    print_schema: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.log_level {
        Some(level) => actionforge::init_tracing_with_level(level),
        None => actionforge::init_tracing(),
    }
    info!(
        version = actionforge::PKG_VERSION,
        config = %args.config.display(),
        dry_run = args.dry_run,
        "Starting Actionforge"
    );

    if args.print_schema {
        let stdout = std::io::stdout();
        cfg::write_schema_to_writer(stdout.lock())?;
        println!();
        return Ok(());
    }

    let config = cfg::load_from_path_async(&args.config).await?;
    debug!(
        target: "actionforge",
        elements = config.elements.len(),
        pacing = config.dispatch.pacing,
        "Configuration loaded successfully"
    );

    let mut runtime = Runtime::new(config, args.dry_run);

    let sources = sources::build_sources_from_config(runtime.config());
    if sources.is_empty() {
        warn!("No payload sources configured. The runtime will wait for Ctrl+C and then exit.");
    }

    let (tx, mut rx) = mpsc::channel::<Value>(256);
    let _handles = sources::spawn_all_sources(&sources, tx);

    // Payloads are handled one at a time; the device takes a single input stream.
    tokio::select! {
        _ = async {
            while let Some(payload) = rx.recv().await {
                match runtime.run_event(&payload) {
                    Ok(outcome) if outcome.succeeded() => {}
                    Ok(outcome) => {
                        warn!(
                            injected = outcome.injected,
                            failed = outcome.failed,
                            "Actions performed with injection failures"
                        );
                    }
                    Err(err) => {
                        error!(error = %format!("{err:#}"), "Failed to perform actions");
                    }
                }
            }
        } => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    info!("Actionforge exited");
    Ok(())
}
