//! AI Vault - console game
//!
//! Play the escape room, validate catalogs, or inspect a save.

#![warn(missing_docs)]

mod cli;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aivault::{GameConfig, GameSession, console, summarize};
use aivault_engine::{
    AchievementEngine, Catalog, FileStorage, PathStore, PersistenceGateway, RoomId, default_state,
};
use anyhow::{Result, bail};
use clap::Parser;
use cli::{Cli, Command};
use tokio::io::BufReader;
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Play {
            config,
            catalog,
            save,
            new,
        } => run_play(config, catalog, save, new).await,
        Command::CheckCatalog { path } => {
            init_stderr_logging();
            check_catalog(&path)
        }
        Command::Status { config, save } => {
            init_stderr_logging();
            print_status(&config, save)
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the config file, falling back to defaults when it does not exist.
fn load_config(path: &Path) -> Result<GameConfig> {
    if path.exists() {
        Ok(GameConfig::from_file(path)?)
    } else {
        warn!(path = %path.display(), "Config file not found; using defaults");
        Ok(GameConfig::default())
    }
}

/// Play in the console.
async fn run_play(
    config_path: PathBuf,
    catalog: Option<PathBuf>,
    save: Option<PathBuf>,
    fresh: bool,
) -> Result<()> {
    // Log to a file so the console stays readable
    let log_file = std::fs::File::create("aivault.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .init();

    info!("Starting AI Vault");

    let mut config = load_config(&config_path)?;
    if let Some(catalog) = catalog {
        config = config.with_catalog_path(catalog);
    }
    if let Some(save) = save {
        config = config.with_save_path(save);
    }

    let mut session = GameSession::from_config(&config)?;
    let resumed = session.start(fresh)?;
    println!(
        "{}",
        if resumed {
            "Welcome back to the AI Vault."
        } else {
            "Welcome to the AI Vault. Five rooms stand between you and the vault."
        }
    );

    let input = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let session = console::run(session, input, &mut stdout).await?;
    session.shutdown().await;

    info!("AI Vault closed");
    Ok(())
}

/// Validate a catalog and print what it contains.
#[instrument]
fn check_catalog(path: &Path) -> Result<()> {
    let catalog = Catalog::from_file(path)?;

    for room in RoomId::ORDER {
        match catalog.room(room) {
            Ok(config) => println!(
                "{:<7} {:<28} {} puzzle(s), artifact '{}'",
                room.as_str(),
                config.name(),
                config.puzzles().len(),
                config.artifact().name()
            ),
            Err(e) => println!("{:<7} BROKEN: {}", room.as_str(), e.message),
        }
    }
    println!(
        "{} puzzle(s), {} badge(s), {} vault step(s)",
        catalog.total_puzzles(),
        catalog.badges().len(),
        catalog.meta_puzzle().steps().len()
    );

    if !catalog.issues().is_empty() {
        bail!("{} room(s) failed validation", catalog.issues().len());
    }
    Ok(())
}

/// Print the progress stored in a save file.
#[instrument(skip(save))]
fn print_status(config_path: &Path, save: Option<PathBuf>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(save) = save {
        config = config.with_save_path(save);
    }
    let catalog = Arc::new(Catalog::from_file(config.catalog_path())?);
    let defaults = default_state(catalog.rules().total_hints());
    let gateway = PersistenceGateway::new(
        Box::new(FileStorage::new(config.save_path())),
        defaults.clone(),
    );

    let mut store = PathStore::new(defaults);
    if !gateway.load(&mut store) {
        println!("No saved game at {}", config.save_path().display());
        return Ok(());
    }

    let achievements = AchievementEngine::new(Arc::clone(&catalog));
    let summary = summarize(&store, &catalog, &achievements);
    println!(
        "{}",
        console::render_summary(&summary, store.hints_remaining())
    );
    Ok(())
}
