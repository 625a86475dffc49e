/// AgentStart CLI — `init`, `generate`, `migrate`.
///
/// A thin scaffolding tool around the embeddable runtime, not a client for
/// it: the binary doesn't start the gateway or drive an agent turn. A host
/// process links `agentstart_runtime` as a library and runs the gateway
/// itself; this CLI is the setup/ops aid that sits next to it.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use agentstart_runtime::config::{AppConfig, default_config_path, load_default_config, save_config};
use agentstart_runtime::memory::migrations;

#[derive(Parser, Debug)]
#[command(
    name = "agentstart",
    about = "AgentStart runtime CLI",
    version,
    long_about = "Setup and operations CLI for the AgentStart embeddable agent runtime."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scaffold a default config.toml at the standard config path.
    Init {
        /// Overwrite an existing config file.
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration (defaults merged with the config
    /// file on disk and any environment overrides) as TOML.
    Generate,
    /// Apply the embedded sqlite schema migration to the runtime database.
    Migrate {
        /// Path to the sqlite database file. Defaults to
        /// `~/.agentstart/agentstart.db`.
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), String> {
    match command {
        Commands::Init { force } => init(force),
        Commands::Generate => generate(),
        Commands::Migrate { db } => migrate(db),
    }
}

fn init(force: bool) -> Result<(), String> {
    let path = default_config_path()?;
    if path.exists() && !force {
        return Err(format!(
            "{} already exists. Pass --force to overwrite.",
            path.display()
        ));
    }
    save_config(&path, &AppConfig::default())?;
    println!("wrote default config to {}", path.display());
    Ok(())
}

fn generate() -> Result<(), String> {
    let config = load_default_config();
    let toml = toml::to_string_pretty(&config).map_err(|e| format!("failed to serialize config: {e}"))?;
    print!("{toml}");
    Ok(())
}

fn migrate(db: Option<PathBuf>) -> Result<(), String> {
    let path = db.map(Ok).unwrap_or_else(default_db_path)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
    }
    let conn = rusqlite::Connection::open(&path).map_err(|e| format!("failed to open {}: {e}", path.display()))?;
    migrations::apply(&conn).map_err(|e| format!("migration failed: {e}"))?;
    println!("applied schema migration to {}", path.display());
    Ok(())
}

fn default_db_path() -> Result<PathBuf, String> {
    dirs::home_dir()
        .map(|h| h.join(".agentstart").join("agentstart.db"))
        .ok_or_else(|| "could not determine home directory".to_string())
}
