//! Command-line host for modengine modules.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use modengine_core::config::env_vars;
use modengine_core::prelude::*;
use modengine_core::{discover, ModuleInfo, NativeLoader};

/// Environment variable selecting JSON log output.
const LOG_JSON_VAR: &str = "MODENGINE_LOG_JSON";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// modengine - load and drive plugin modules.
#[derive(Parser, Debug)]
#[command(name = "modengine")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// TOML settings file.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Module configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Module setup file.
    #[arg(long, global = true)]
    setup: Option<PathBuf>,

    /// Directory scanned for modules.
    #[arg(long, global = true)]
    modules: Option<PathBuf>,

    /// Engine mode: normal, demo or debug.
    #[arg(long, global = true)]
    mode: Option<Mode>,

    /// Load modules in file name order.
    #[arg(long, global = true)]
    sorted: bool,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Start every module, report them and shut down.
    Run,
    /// List loaded modules.
    List {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Check a directory for valid modules without starting them.
    Check {
        /// Directory to scan.
        #[arg(required = true)]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match &args.command {
        Command::Run => run_engine(&args),
        Command::List { json } => list_modules(&args, *json),
        Command::Check { dir } => check_dir(&args, dir),
    }
}

fn init_logging(verbose: bool) {
    let json_logging = std::env::var(LOG_JSON_VAR)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "modengine={0},modengine_core={0}",
            default_level
        ))
        .add_directive(tracing::Level::WARN.into())
    });

    // Logs go to stderr so `list --json` output stays parseable.
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Settings file, then environment, then command-line flags.
fn build_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.settings {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    config.apply_env().with_context(|| {
        format!(
            "Invalid environment override ({}, {}, ...)",
            env_vars::MODE,
            env_vars::MODULES_DIR
        )
    })?;

    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(path) = &args.config {
        config.config_path = path.clone();
    }
    if let Some(path) = &args.setup {
        config.setup_path = path.clone();
    }
    if let Some(dir) = &args.modules {
        config.modules_dir = dir.clone();
    }
    if args.sorted {
        config.entry_order = EntryOrder::FileName;
    }

    Ok(config)
}

fn start_engine(args: &Args) -> Result<Engine> {
    let config = build_config(args)?;
    tracing::debug!("Engine configuration: {:?}", config);

    let modules_dir = config.modules_dir.clone();
    Engine::new(GraphicControls::headless(), config)
        .with_context(|| format!("Failed to start engine on {}", modules_dir.display()))
}

fn run_engine(args: &Args) -> Result<()> {
    let engine = start_engine(args)?;

    println!("Loaded {} module(s)", engine.module_count());
    for name in engine.module_names() {
        println!("  {}", name);
    }

    engine.free();
    Ok(())
}

fn list_modules(args: &Args, json: bool) -> Result<()> {
    let engine = start_engine(args)?;
    let infos = engine.module_infos();

    if json {
        let output = serde_json::to_string_pretty(&infos).context("Failed to encode module list")?;
        println!("{}", output);
    } else {
        print_infos(&infos);
    }

    engine.free();
    Ok(())
}

fn check_dir(args: &Args, dir: &Path) -> Result<()> {
    let order = if args.sorted {
        EntryOrder::FileName
    } else {
        EntryOrder::Filesystem
    };

    let checked_at = chrono::Utc::now();

    match discover(&NativeLoader, dir, order) {
        Ok(loaded) => {
            println!("Module Check: PASSED");
            println!("Checked at: {}", checked_at.format(TIMESTAMP_FORMAT));
            println!();
            let infos: Vec<ModuleInfo> = loaded.iter().map(|m| m.info()).collect();
            if infos.is_empty() {
                println!("No modules found in {}", dir.display());
            } else {
                print_infos(&infos);
            }
            for module in loaded {
                module.close();
            }
            Ok(())
        }
        Err(failure) => {
            let error = failure.unwind();
            println!("Module Check: FAILED");
            println!("Checked at: {}", checked_at.format(TIMESTAMP_FORMAT));
            println!();
            println!("Error: {}", error);
            println!();
            println!("Every library in the directory must export:");
            for symbol in modengine_core::abi::REQUIRED_SYMBOLS {
                println!("  {}", symbol);
            }
            Err(error).with_context(|| format!("{} contains an invalid module", dir.display()))
        }
    }
}

fn print_infos(infos: &[ModuleInfo]) {
    for info in infos {
        println!("Name:      {}", info.name);
        println!("Version:   {}", info.version);
        println!("File:      {}", info.file.display());
        println!("Loaded at: {}", info.loaded_at.format(TIMESTAMP_FORMAT));
        println!();
    }
}
