use std::sync::atomic::Ordering;

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agentdx::constants;
use agentdx::logger;

#[tokio::main]
async fn main() {
    // Parse loglevel/quiet/json from raw args, ahead of clap, since tracing
    // has to be set up before Cli::parse() runs any subcommand logic.
    let args: Vec<String> = std::env::args().collect();
    let is_quiet = args.iter().any(|a| a == "-q" || a == "--quiet");
    let is_json = args.iter().any(|a| a == "--json");
    let is_watch = args.iter().any(|a| a == "watch");

    let loglevel = args
        .iter()
        .position(|a| a == "-l" || a == "--loglevel")
        .and_then(|pos| args.get(pos + 1))
        .cloned()
        .unwrap_or_else(|| "info".to_string());

    let log_level = logger::LogLevel::parse(&loglevel).unwrap_or(logger::LogLevel::Info);
    let log_level_str = log_level.as_str();

    let cancel_token = CancellationToken::new();
    let cancel_clone = cancel_token.clone();

    // First Ctrl-C: graceful shutdown via the cancellation token. Second:
    // force exit, matching the double-press convention a long-running
    // watch daemon needs.
    ctrlc::set_handler(move || {
        if constants::SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            eprintln!("\nforce shutdown");
            std::process::exit(130);
        }
        if !is_quiet && !is_json {
            eprintln!("\nshutting down gracefully... (press Ctrl-C again to force)");
        }
        constants::SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
        cancel_clone.cancel();
    })
    .expect("failed to set Ctrl-C handler");

    // `watch` runs long enough to want rotated file logs; short-lived
    // commands get console-only tracing on stderr (stdout is reserved for
    // program output, especially --json).
    if !is_quiet && !is_json && !is_watch {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| format!("agentdx={log_level_str}").into()),
            )
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();

        info!("Starting agentdx v{} (loglevel: {log_level_str})", env!("CARGO_PKG_VERSION_FULL"));
    }

    if let Err(e) = agentdx::cli::run(cancel_token).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
