//! `agentdx` command-line surface: one subcommand per external interface
//! named in the project's external-interfaces design, dispatching into
//! the library modules.

pub mod doctor;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::booster::Booster;
use crate::config::Config;
use crate::constants::{COMPOSE_FILE_NAME, SYMBOLS_FILE_NAME};
use crate::container::ContainerSupervisor;
use crate::daemon::DaemonManager;
use crate::error::{AgentdxError, Result};
use crate::fts::FtsStore;
use crate::ignore_matcher::IgnoreMatcher;
use crate::indexer::Indexer;
use crate::logger::{self, LogLevel};
use crate::search::{self, SearchOptions};
use crate::symbols::{SymbolStore, TraceMode};
use crate::watch::FileWatcher;

#[derive(Parser, Debug)]
#[command(name = "agentdx")]
#[command(author, version = env!("CARGO_PKG_VERSION_FULL"), about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long, global = true, default_value = "info")]
    pub loglevel: String,

    /// Suppress informational output (only show results/errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output machine-readable JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a project: slug, .agentdx/ layout, compose.yaml, first full scan
    Init {
        path: Option<PathBuf>,
    },

    /// One-shot full (re)index of the project
    Index {
        path: Option<PathBuf>,

        /// Re-index every file even if unchanged
        #[arg(short = 'f', long)]
        force: bool,
    },

    /// Full-text search over indexed chunks, boosted by file path
    Search {
        query: String,

        #[arg(short = 'm', long = "limit", default_value = "25")]
        limit: usize,

        #[arg(long)]
        compact: bool,

        #[arg(long)]
        filter_path: Option<String>,

        path: Option<PathBuf>,
    },

    /// Walk the call graph from a symbol
    Trace {
        symbol: String,

        #[arg(long, default_value = "callees")]
        mode: String,

        #[arg(long, default_value = "3")]
        depth: usize,

        path: Option<PathBuf>,
    },

    /// List indexable files under the project root
    Files {
        #[arg(long)]
        compact: bool,

        path: Option<PathBuf>,
    },

    /// Show FTS and symbol store statistics
    Stats {
        path: Option<PathBuf>,
    },

    /// Run the watch+index loop in the foreground, or as the daemon subprocess
    Watch {
        /// Run as the detached subprocess the daemon manager spawns
        #[arg(long)]
        daemon: bool,

        #[arg(long)]
        pg_name: Option<String>,

        #[arg(long)]
        pg_port: Option<u16>,

        path: Option<PathBuf>,
    },

    /// Start the background watch daemon for this project
    Start {
        #[arg(long)]
        pg_name: Option<String>,

        #[arg(long)]
        pg_port: Option<u16>,

        path: Option<PathBuf>,
    },

    /// Stop the background watch daemon
    Stop {
        #[arg(short = 'f', long)]
        force: bool,

        path: Option<PathBuf>,
    },

    /// Report whether the daemon is running for this project
    Status {
        path: Option<PathBuf>,
    },

    /// Check Docker, Postgres, and daemon health
    Doctor {
        path: Option<PathBuf>,
    },
}

fn resolve_root(path: Option<PathBuf>) -> Result<PathBuf> {
    let root = path.unwrap_or(PathBuf::from("."));
    std::fs::canonicalize(&root).map_err(|e| AgentdxError::io(&root, e.to_string()))
}

/// Open (or fail with a helpful hint to run `init`) the project's config,
/// container, FTS store, and symbol store.
async fn open_project(
    root: &std::path::Path,
) -> Result<(Config, ContainerSupervisor, Arc<FtsStore>, Arc<SymbolStore>)> {
    let config = Config::load(root).map_err(|_| {
        AgentdxError::config(format!(
            "no agentdx project at {} — run `agentdx init` first",
            root.display()
        ))
    })?;

    let supervisor = ContainerSupervisor::new(config.container.clone(), &config.slug);
    supervisor.ensure_running().await?;

    let fts = Arc::new(FtsStore::connect(&supervisor.database_url(), &config.slug).await?);
    let symbols_path = Config::state_dir(root).join(SYMBOLS_FILE_NAME);
    let symbols = Arc::new(SymbolStore::open(symbols_path).await?);

    Ok((config, supervisor, fts, symbols))
}

fn print_or_json(json_mode: bool, value: impl serde::Serialize, human: impl FnOnce()) {
    if json_mode {
        println!("{}", serde_json::to_string(&value).unwrap_or_default());
    } else {
        human();
    }
}

pub async fn run(cancel_token: CancellationToken) -> Result<()> {
    let cli = Cli::parse();

    if cli.quiet || cli.json {
        crate::output::set_quiet(true);
    }
    let log_level = LogLevel::parse(&cli.loglevel).unwrap_or(LogLevel::Info);

    let result = dispatch(cli.command, cli.json, cli.quiet, log_level, cancel_token).await;

    match result {
        Ok(()) => Ok(()),
        Err(e) if cli.json => {
            println!(
                "{}",
                json!({"error": e.to_string(), "kind": e.kind()})
            );
            if e.is_semantic() {
                Ok(())
            } else {
                Err(e)
            }
        }
        Err(e) => Err(e),
    }
}

async fn dispatch(
    command: Commands,
    json_mode: bool,
    quiet: bool,
    log_level: LogLevel,
    cancel_token: CancellationToken,
) -> Result<()> {
    match command {
        Commands::Init { path } => cmd_init(path).await,
        Commands::Index { path, force } => cmd_index(path, force).await,
        Commands::Search {
            query,
            limit,
            compact,
            filter_path,
            path,
        } => cmd_search(path, query, limit, compact, filter_path, json_mode).await,
        Commands::Trace {
            symbol,
            mode,
            depth,
            path,
        } => cmd_trace(path, symbol, mode, depth, json_mode).await,
        Commands::Files { compact, path } => cmd_files(path, compact, json_mode).await,
        Commands::Stats { path } => cmd_stats(path, json_mode).await,
        Commands::Watch {
            daemon,
            pg_name,
            pg_port,
            path,
        } => cmd_watch(path, daemon, pg_name, pg_port, quiet, log_level, cancel_token).await,
        Commands::Start {
            pg_name,
            pg_port,
            path,
        } => cmd_start(path, pg_name, pg_port).await,
        Commands::Stop { force, path } => cmd_stop(path, force),
        Commands::Status { path } => cmd_status(path, json_mode),
        Commands::Doctor { path } => {
            let root = resolve_root(path)?;
            doctor::run(&root, json_mode).await
        }
    }
}

async fn cmd_init(path: Option<PathBuf>) -> Result<()> {
    let root = path.unwrap_or(PathBuf::from("."));
    std::fs::create_dir_all(&root).map_err(|e| AgentdxError::io(&root, e.to_string()))?;
    let root = std::fs::canonicalize(&root).map_err(|e| AgentdxError::io(&root, e.to_string()))?;

    let state_dir = Config::state_dir(&root);
    if Config::config_path(&root).exists() {
        crate::info_print!("Project already initialized at {}", state_dir.display());
    } else {
        let config = Config::new_default(&root)?;
        config.save(&root)?;
        write_compose_file(&root, &config)?;
        crate::info_print!(
            "Initialized project '{}' (slug {}) in {}",
            config.project_name,
            config.slug,
            state_dir.display()
        );
    }

    let config = Config::load(&root)?;
    let supervisor = ContainerSupervisor::new(config.container.clone(), &config.slug);
    supervisor.ensure_running().await?;

    let fts = Arc::new(FtsStore::connect(&supervisor.database_url(), &config.slug).await?);
    let symbols_path = state_dir.join(SYMBOLS_FILE_NAME);
    let symbols = Arc::new(SymbolStore::open(symbols_path).await?);
    let indexer = Indexer::new(&root, &config, fts, symbols)?;
    let stats = indexer.full_index(&state_dir).await?;
    crate::info_print!(
        "Initial index: {} files, {} chunks, {} symbols",
        stats.files_indexed, stats.chunks_written, stats.symbols_found
    );
    Ok(())
}

fn write_compose_file(root: &std::path::Path, config: &Config) -> Result<()> {
    let path = Config::state_dir(root).join(COMPOSE_FILE_NAME);
    let contents = format!(
        "services:\n  postgres:\n    image: {}\n    container_name: {}\n    ports:\n      - \"{}:5432\"\n    volumes:\n      - {}:/var/lib/postgresql/data\n    environment:\n      POSTGRES_USER: agentdx\n      POSTGRES_PASSWORD: agentdx\n      POSTGRES_DB: agentdx\nvolumes:\n  {}:\n",
        config.container.image,
        config.container.container_name,
        config.container.port,
        config.container.volume_name,
        config.container.volume_name,
    );
    std::fs::write(&path, contents).map_err(|e| AgentdxError::io(&path, e.to_string()))
}

async fn cmd_index(path: Option<PathBuf>, force: bool) -> Result<()> {
    let root = resolve_root(path)?;
    let (config, _supervisor, fts, symbols) = open_project(&root).await?;
    if force {
        fts.clear().await?;
    }
    let indexer = Indexer::new(&root, &config, fts, symbols)?;
    let stats = indexer.full_index(&Config::state_dir(&root)).await?;
    crate::info_print!(
        "Indexed {} files ({} skipped), {} chunks, {} symbols in {}ms",
        stats.files_indexed, stats.files_skipped, stats.chunks_written, stats.symbols_found, stats.duration_ms
    );
    Ok(())
}

async fn cmd_search(
    path: Option<PathBuf>,
    query: String,
    limit: usize,
    compact: bool,
    filter_path: Option<String>,
    json_mode: bool,
) -> Result<()> {
    let root = resolve_root(path)?;
    let (_config, _supervisor, fts, _symbols) = open_project(&root).await?;
    let booster = Booster::default();
    let options = SearchOptions {
        max_results: limit,
        compact,
        json: json_mode,
        filter_path,
    };
    let output = search::search(&fts, &booster, &query, &options).await?;
    if json_mode {
        println!("{}", serde_json::to_string(&output).unwrap_or_default());
    } else {
        search::print_human(&output, compact);
    }
    Ok(())
}

async fn cmd_trace(
    path: Option<PathBuf>,
    symbol: String,
    mode: String,
    depth: usize,
    json_mode: bool,
) -> Result<()> {
    let root = resolve_root(path)?;
    let (_config, _supervisor, _fts, symbols) = open_project(&root).await?;

    let trace_mode = match mode.as_str() {
        "callers" => TraceMode::Callers,
        "callees" => TraceMode::Callees,
        other => {
            return Err(AgentdxError::query(format!(
                "unknown trace mode '{other}', expected 'callers' or 'callees'"
            )))
        }
    };

    let hops = symbols.trace(&symbol, trace_mode, depth).await;
    if hops.is_empty() && symbols.find_by_name(&symbol).await.is_empty() {
        return Err(AgentdxError::query(format!("no symbol named '{symbol}'")));
    }

    if json_mode {
        println!("{}", serde_json::to_string(&hops).unwrap_or_default());
    } else if hops.is_empty() {
        crate::info_print!("'{}' has no {} within depth {}", symbol, mode, depth);
    } else {
        for hop in &hops {
            crate::info_print!(
                "{}{} ({}:{}) via line {}",
                "  ".repeat(hop.depth),
                hop.symbol.name,
                hop.symbol.file,
                hop.symbol.line,
                hop.via_line
            );
        }
    }
    Ok(())
}

async fn cmd_files(path: Option<PathBuf>, compact: bool, json_mode: bool) -> Result<()> {
    let root = resolve_root(path)?;
    let (_config, _supervisor, fts, _symbols) = open_project(&root).await?;
    let files = fts.list_files_with_stats().await?;

    if json_mode {
        let value = if compact {
            json!(files.iter().map(|f| json!({"path": f.path})).collect::<Vec<_>>())
        } else {
            json!(files
                .iter()
                .map(|f| json!({"path": f.path, "mod_time": f.mod_time}))
                .collect::<Vec<_>>())
        };
        println!("{}", serde_json::to_string(&value).unwrap_or_default());
        return Ok(());
    }

    for file in &files {
        if compact {
            crate::info_print!("{}", file.path);
        } else {
            crate::info_print!("{}  {} chunks  updated {}", file.path, file.chunk_count, file.mod_time);
        }
    }
    Ok(())
}

async fn cmd_stats(path: Option<PathBuf>, json_mode: bool) -> Result<()> {
    let root = resolve_root(path)?;
    let (_config, _supervisor, fts, symbols) = open_project(&root).await?;
    let fts_stats = fts.stats().await?;
    let symbol_count = symbols.symbol_count().await;
    let edge_count = symbols.edge_count().await;

    print_or_json(
        json_mode,
        json!({
            "documents": fts_stats.document_count,
            "distinct_files": fts_stats.distinct_files,
            "symbols": symbol_count,
            "call_edges": edge_count,
        }),
        || {
            crate::info_print!("Documents: {}", fts_stats.document_count);
            crate::info_print!("Distinct files: {}", fts_stats.distinct_files);
            crate::info_print!("Symbols: {}", symbol_count);
            crate::info_print!("Call edges: {}", edge_count);
        },
    );
    Ok(())
}

async fn cmd_watch(
    path: Option<PathBuf>,
    daemon: bool,
    pg_name: Option<String>,
    pg_port: Option<u16>,
    quiet: bool,
    log_level: LogLevel,
    cancel_token: CancellationToken,
) -> Result<()> {
    let root = resolve_root(path)?;
    let mut config = Config::load(&root).map_err(|_| {
        AgentdxError::config(format!(
            "no agentdx project at {} — run `agentdx init` first",
            root.display()
        ))
    })?;
    if let Some(name) = pg_name {
        config.container.container_name = name;
    }
    if let Some(port) = pg_port {
        config.container.port = port;
    }

    let state_dir = Config::state_dir(&root);

    // As the detached daemon subprocess there's no terminal to log to;
    // init_logger becomes the process's one and only tracing subscriber.
    if daemon {
        match logger::init_logger(&state_dir, log_level, quiet) {
            Ok((log_dir, rotation)) => {
                logger::start_cleanup_task(log_dir, rotation, cancel_token.clone());
            }
            Err(e) => eprintln!("warning: failed to initialize file logger: {e}"),
        }
    }

    let supervisor = ContainerSupervisor::new(config.container.clone(), &config.slug);
    supervisor.ensure_running().await?;

    let fts = Arc::new(FtsStore::connect(&supervisor.database_url(), &config.slug).await?);
    let symbols = Arc::new(SymbolStore::open(state_dir.join(SYMBOLS_FILE_NAME)).await?);
    let indexer = Indexer::new(&root, &config, fts, symbols)?;

    indexer.full_index(&state_dir).await?;

    let ignore = IgnoreMatcher::new(&root, &config.ignore_extra)?;
    let mut watcher = FileWatcher::new(root.clone(), ignore);
    watcher.start(config.debounce_ms)?;
    info!("Watching {} for changes", root.display());

    loop {
        if cancel_token.is_cancelled() {
            break;
        }
        let events = watcher.wait_for_events(Duration::from_millis(500));
        for event in events {
            let result = match &event {
                crate::watch::FileEvent::Created(p) => indexer.index_file(p).await.map(|_| ()),
                crate::watch::FileEvent::Modified(p) => indexer.index_file(p).await.map(|_| ()),
                crate::watch::FileEvent::Deleted(p) => indexer.remove_file(p).await,
            };
            if let Err(e) = result {
                warn!("Failed to apply {:?}: {e}", event);
            }
        }
    }

    watcher.stop();
    Ok(())
}

async fn cmd_start(path: Option<PathBuf>, pg_name: Option<String>, pg_port: Option<u16>) -> Result<()> {
    let root = resolve_root(path)?;
    let state_dir = Config::state_dir(&root);
    let manager = DaemonManager::new(&root, &state_dir);

    let mut extra_args = Vec::new();
    if let Some(name) = pg_name {
        extra_args.push("--pg-name".to_string());
        extra_args.push(name);
    }
    if let Some(port) = pg_port {
        extra_args.push("--pg-port".to_string());
        extra_args.push(port.to_string());
    }

    let pid = manager.start(&extra_args)?;
    crate::info_print!("Daemon started (pid {pid})");
    Ok(())
}

fn cmd_stop(path: Option<PathBuf>, force: bool) -> Result<()> {
    let root = resolve_root(path)?;
    let state_dir = Config::state_dir(&root);
    let manager = DaemonManager::new(&root, &state_dir);
    manager.stop(force)?;
    crate::info_print!("Daemon stopped");
    Ok(())
}

fn cmd_status(path: Option<PathBuf>, json_mode: bool) -> Result<()> {
    let root = resolve_root(path)?;
    let state_dir = Config::state_dir(&root);
    let manager = DaemonManager::new(&root, &state_dir);
    let status = manager.status()?;

    if json_mode {
        println!("{}", serde_json::to_string(&status).unwrap_or_default());
    } else {
        match status {
            crate::daemon::DaemonStatus::Running {
                pid,
                start_time,
                log_path,
            } => {
                crate::info_print!(
                    "Daemon running (pid {pid}, started {start_time}, log {})",
                    log_path.display()
                )
            }
            crate::daemon::DaemonStatus::Stopped => crate::info_print!("Daemon not running"),
        }
    }
    Ok(())
}
