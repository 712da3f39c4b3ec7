//! ircrelay - Main binary

use clap::{Parser, Subcommand};
use ircrelay_core::config::PasswordHasher;
use ircrelay_core::{connection, Config, Server};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

/// How long queued farewell lines get to reach clients on shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// ircrelay - A chat relay server speaking RFC 1459/2812
#[derive(Parser)]
#[command(name = "ircrelay")]
#[command(about = "A chat relay server speaking the RFC 1459/2812 IRC protocol")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Test configuration and exit
    #[arg(long)]
    test_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a default configuration file
    Config {
        /// Output file path
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
    /// Show the effective configuration
    Info,
    /// Print the credential hash for an operator password
    HashPassword {
        /// Plaintext password
        password: String,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match &cli.command {
        Some(Commands::Config { output }) => return generate_config(output),
        Some(Commands::HashPassword { password }) => {
            println!("{}", PasswordHasher::hash_password(password));
            return Ok(());
        }
        Some(Commands::Version) => {
            println!("ircrelay {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    let config = load_config(&cli.config)?;
    if matches!(cli.command, Some(Commands::Info)) {
        show_info(&config);
        return Ok(());
    }
    if cli.test_config {
        info!("Configuration is valid");
        return Ok(());
    }

    let bind = format!("{}:{}", config.server.bind_address, config.server.port);
    let server = Arc::new(Server::new(config)?);
    let listener = TcpListener::bind(&bind).await?;

    let connections = TaskTracker::new();

    info!("Starting ircrelay as {}", server.name());
    tokio::select! {
        result = connection::serve(server.clone(), listener, connections.clone()) => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, shutting down");
            server.shutdown("Server shutting down");
        }
    }

    connections.close();
    if tokio::time::timeout(SHUTDOWN_GRACE, connections.wait()).await.is_err() {
        warn!("{} connections still open after shutdown", connections.len());
    }

    Ok(())
}

fn init_logging(level: &str) -> anyhow::Result<()> {
    let log_level = level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    Ok(())
}

/// Load and validate `path`, falling back to defaults when it does not exist
fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = if path.exists() {
        info!("Loading configuration from {:?}", path);
        Config::from_file(path)?
    } else {
        info!("Configuration file not found, using defaults");
        Config::default()
    };
    config.validate()?;
    Ok(config)
}

fn generate_config(output: &Path) -> anyhow::Result<()> {
    Config::default().to_file(output)?;
    println!("Generated default configuration file: {:?}", output);
    Ok(())
}

fn show_info(config: &Config) {
    println!("ircrelay {}", env!("CARGO_PKG_VERSION"));
    println!("Server:   {} ({})", config.server.name, config.server.description);
    println!("Network:  {}", config.network.name);
    println!("Listen:   {}:{}", config.server.bind_address, config.server.port);
    println!("Clients:  up to {}", config.server.max_clients);
    println!(
        "Channels: {} per client, {} in total",
        config.limits.max_channels_per_client, config.limits.max_channels
    );
    println!(
        "Modes:    channels +{}, users +{}",
        config.channels.default_modes, config.users.default_modes
    );
    println!("Opers:    {}", config.operators.len());
    println!(
        "Keepalive: ping after {}s, drop after {}s",
        config.connection.ping_interval, config.connection.ping_timeout
    );
}
