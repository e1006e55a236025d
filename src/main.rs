use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use flowsmith::config::{self, Config, Settings};
use flowsmith::consts::{SERVER_NAME, SERVER_VERSION, default_db_path, mask_secret};
use flowsmith::logging::init_tracing;
use flowsmith::server::McpServer;
use flowsmith::services::Backends;
use flowsmith::tools::ToolRegistry;

#[derive(Parser)]
#[command(
    name = "flowsmith",
    version,
    about = "MCP server for n8n workflows, Airtable schemas and Telegram bots."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// SQLite database for stored settings (default: ~/.flowsmith/flowsmith.db)
    #[arg(short, long, global = true)]
    db: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Serve MCP over stdin/stdout (default)
    Serve,
    /// Print the tools enabled by the current settings
    Tools,
    /// Read or change stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the resolved value of a setting
    Get { key: String },
    /// Store a setting
    Set { key: String, value: String },
    /// Remove a stored setting
    Unset { key: String },
    /// Print every setting with its source
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = open_config(cli.db)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Tools => print_tools(&config).await,
        Command::Config { action } => handle_config(&config, action),
    }
}

fn open_config(db: Option<PathBuf>) -> Result<Config> {
    let path = match db {
        Some(path) => path,
        None => default_db_path()?,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let path = path.to_str().context("database path is not valid UTF-8")?;
    Config::open(path)
}

async fn registry(config: &Config) -> Result<ToolRegistry> {
    let settings = Settings::load(config)?;
    let backends = Backends::from_settings(&settings)?;
    Ok(ToolRegistry::with_backends(&backends).await)
}

async fn serve(config: &Config) -> Result<()> {
    let tools = Arc::new(registry(config).await?);
    let tool_count = tools.descriptions().await.len();
    info!(version = SERVER_VERSION, tools = tool_count, "{SERVER_NAME} starting");

    let server = McpServer::new(tools);
    tokio::select! {
        result = server.serve_stdio() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            Ok(())
        }
    }
}

async fn print_tools(config: &Config) -> Result<()> {
    let tools = registry(config).await?;
    for tool in tools.descriptions().await {
        println!("{:<22} {}", tool.name, tool.description);
    }
    Ok(())
}

fn handle_config(config: &Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Get { key } => match config.resolve(&key)? {
            Some(value) => println!("{value}"),
            None => bail!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            println!("✓ {key} saved");
        }
        ConfigAction::Unset { key } => {
            if config::lookup(&key).is_none() {
                bail!("unknown setting: {key}");
            }
            config.remove(&key)?;
            println!("✓ {key} removed");
        }
        ConfigAction::List => {
            for setting in config::SETTINGS {
                let resolved =
                    config.resolve_source_with(setting.key, |var| std::env::var(var).ok())?;
                let (shown, source) = match resolved {
                    Some((v, source)) if setting.secret => (mask_secret(&v), source.to_string()),
                    Some((v, source)) => (v, source.to_string()),
                    None => ("<unset>".to_string(), "unset".to_string()),
                };
                println!("{:<20} {:<40} ({source})", setting.key, shown);
            }
        }
    }
    Ok(())
}
