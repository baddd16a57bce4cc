//! CLI entry point for the hotswap reload engine.
//!
//! # Usage
//!
//! ```bash
//! hotswap [OPTIONS] <COMMAND>
//!
//! # Write a starter configuration
//! hotswap init
//!
//! # Validate the configuration
//! hotswap check --config hotswap.json
//!
//! # Load a unit once and show its exports
//! hotswap load units/metrics.unit --name metrics
//!
//! # Evaluate a restricted expression against a unit's bindings
//! hotswap eval "total(3) + 1" --unit units/pricing.unit
//!
//! # Load configured modules and watch for changes until interrupted
//! hotswap watch --config hotswap.json
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use hs_core::Config;
use hs_debug::{Debugger, EventLog};
use hs_engine::{AutoReloader, HotSwapEngine, ScriptLoader, SymbolKind};
use hs_expr::Scope;
use hs_watcher::PollWatcher;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Hot-reload engine for script units: load code, watch it, swap it live.
#[derive(Parser)]
#[command(name = "hotswap", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "HOTSWAP_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file.
    Init,

    /// Validate the configuration and report problems.
    Check,

    /// Load a unit once and print its exports.
    Load {
        /// Path to the unit source file.
        path: Utf8PathBuf,

        /// Module name (derived from the path if omitted).
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Evaluate a restricted expression.
    Eval {
        /// The expression to evaluate.
        expression: String,

        /// Unit file whose bindings the expression may reference.
        #[arg(short, long)]
        unit: Option<Utf8PathBuf>,
    },

    /// Load configured modules and watch for changes until interrupted.
    Watch {
        /// Detect and report changes without reloading.
        #[arg(long)]
        no_reload: bool,
    },
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},ignore=warn,mio=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Returns the configuration path from the CLI, defaulting to
/// `./hotswap.json`.
fn config_path(cli: &Cli) -> Utf8PathBuf {
    cli.config
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from("hotswap.json"))
}

/// Loads the configuration file.
fn load_config(cli: &Cli) -> color_eyre::Result<Config> {
    let path = config_path(cli);
    Config::load(&path)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load configuration {path}: {e}"))
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Writes a starter configuration, refusing to overwrite an existing one.
fn run_init(cli: &Cli) -> color_eyre::Result<()> {
    let path = config_path(cli);
    if path.exists() {
        return Err(color_eyre::eyre::eyre!(
            "Configuration already exists: {path}"
        ));
    }

    let config = Config::default();
    config
        .save(&path)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to write {path}: {e}"))?;
    info!(path = %path, "Configuration written");
    Ok(())
}

/// Validates the configuration, failing if any problem is found.
fn run_check(cli: &Cli) -> color_eyre::Result<()> {
    let config = load_config(cli)?;
    let problems = config.validate();

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    if problems.is_empty() {
        let _ = writeln!(handle, "Configuration OK ({} modules)", config.modules.len());
        return Ok(());
    }

    let _ = writeln!(handle, "Problems ({}):", problems.len());
    for problem in &problems {
        let _ = writeln!(handle, "  {problem}");
    }
    Err(color_eyre::eyre::eyre!(
        "{} configuration problem(s)",
        problems.len()
    ))
}

/// Loads one unit and prints its exports.
fn run_load(path: &Utf8PathBuf, name: Option<&str>) -> color_eyre::Result<()> {
    let engine = HotSwapEngine::new(Arc::new(ScriptLoader::new()));
    let unit = engine.load(path, name)?;
    let info = engine.info(unit.name())?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let _ = writeln!(handle, "Module:  {}", info.name);
    let _ = writeln!(handle, "Path:    {}", info.path);
    let _ = writeln!(handle, "Symbols:");
    for symbol in unit.symbols() {
        match unit.describe(&symbol) {
            Some(SymbolKind::Constant(value)) => {
                let _ = writeln!(
                    handle,
                    "  {symbol} = {} ({})",
                    value.repr(),
                    value.type_name()
                );
            }
            Some(SymbolKind::Function { signature, .. }) => {
                let _ = writeln!(handle, "  {signature}");
            }
            None => {}
        }
    }
    Ok(())
}

/// Evaluates an expression, optionally against a unit's bindings.
fn run_eval(expression: &str, unit: Option<&Utf8PathBuf>) -> color_eyre::Result<()> {
    let scope = match unit {
        Some(path) => {
            let source = std::fs::read_to_string(path.as_std_path())
                .map_err(|e| color_eyre::eyre::eyre!("Failed to read {path}: {e}"))?;
            ScriptLoader::new()
                .load_scope(&source)
                .map_err(|e| color_eyre::eyre::eyre!("Failed to load {path}: {e}"))?
        }
        None => Scope::new(),
    };

    let debugger = Debugger::new(hs_core::DebugConfig {
        log_to_file: false,
        ..hs_core::DebugConfig::default()
    });
    let value = debugger.evaluate(expression, &scope)?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    let _ = writeln!(handle, "{}", value.repr());
    Ok(())
}

/// Loads configured modules and watches for changes until interrupted.
async fn run_watch(config: Config, no_reload: bool) -> color_eyre::Result<()> {
    // Retention maintenance before anything writes to the log directory.
    if config.debug.log_to_file {
        match EventLog::prune_older_than(&config.debug.log_dir, config.debug.keep_logs_days) {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Pruned old log files"),
            Err(e) => warn!(error = %e, "Log pruning skipped"),
        }
    }

    let debugger = Arc::new(Debugger::new(config.debug.clone()));
    let engine = Arc::new(
        HotSwapEngine::new(Arc::new(ScriptLoader::new())).with_backup(config.backup.clone()),
    );

    // Surface reload outcomes through the debug facility's event log.
    {
        let debugger_for_changes = Arc::clone(&debugger);
        engine.bus().add_change_observer(move |name, _old, new| {
            debugger_for_changes.log_event(&format!(
                "Module reloaded: {name} ({} symbols)",
                new.symbols().len()
            ));
            Ok(())
        });
        let debugger_for_errors = Arc::clone(&debugger);
        engine.bus().add_error_observer(move |message, detail| {
            debugger_for_errors.log_event(&format!("Reload error: {message} | {detail}"));
            Ok(())
        });
    }

    let results = engine.load_from_config(&config);
    let loaded = results.iter().filter(|(_, r)| r.is_ok()).count();
    info!(
        loaded,
        failed = results.len() - loaded,
        "Configured modules loaded"
    );

    let auto_reload = !no_reload && config.mode.is_auto() && config.watch.auto_reload;
    let mut watcher = PollWatcher::new(config.watch.clone(), engine.fingerprint_store());
    if auto_reload {
        watcher = watcher.with_handler(Arc::new(AutoReloader::new(Arc::clone(&engine))));
    }
    let mut changes = watcher.subscribe();
    watcher.start();

    info!(auto_reload, "Watching; press ctrl-c to stop");

    // Run until interrupted, reporting each cycle's changes.
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                    break;
                }
                Some(batch) = changes.recv() => {
                    for event in &batch {
                        info!(path = %event.path, cycle = batch.cycle, "File changed");
                    }
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                Some(batch) = changes.recv() => {
                    for event in &batch {
                        info!(path = %event.path, cycle = batch.cycle, "File changed");
                    }
                }
            }
        }
    }

    watcher
        .stop()
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Watcher shutdown failed: {e}"))?;

    print_watch_summary(&engine);
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Prints per-module reload counts after a watch run.
fn print_watch_summary(engine: &HotSwapEngine) {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let _ = writeln!(handle);
    let _ = writeln!(handle, "Watch summary");
    let _ = writeln!(handle, "=============");
    for name in engine.list() {
        if let Ok(info) = engine.info(&name) {
            let _ = writeln!(
                handle,
                "  {:<20} reloads: {:<4} path: {}",
                info.name, info.reload_count, info.path
            );
        }
    }
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.no_color);

    match &cli.command {
        Commands::Init => run_init(&cli),
        Commands::Check => run_check(&cli),
        Commands::Load { path, name } => run_load(path, name.as_deref()),
        Commands::Eval { expression, unit } => run_eval(expression, unit.as_ref()),
        Commands::Watch { no_reload } => {
            let config = load_config(&cli)?;
            run_watch(config, *no_reload).await
        }
    }
}
