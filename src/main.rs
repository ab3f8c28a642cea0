//! Patient/provider directory API entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use patient_directory::api::AppState;
use patient_directory::config::Config;
use patient_directory::server::{
    check_connectivity, serve, spawn_connectivity_check, STARTUP_CHECK_TIMEOUT,
};
use patient_directory::store::{MySqlStore, DEFAULT_ACQUIRE_TIMEOUT};
use patient_directory::utils::shutdown_signal;
use patient_directory::AppError;

/// Read-only patient and provider directory API.
#[derive(Parser, Debug)]
#[command(name = "patient-directory")]
#[command(about = "Read-only HTTP API over a MySQL directory of patients and providers")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP listening port (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (default).
    Serve {
        /// HTTP listening port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Check that the database is reachable.
    CheckDb,
}

/// How long shutdown waits for checked-out connections to come back.
const POOL_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration first so RUST_LOG from .env reaches the filter
    let config = load_config();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("patient_directory=debug,tower_http=debug,info")
    } else {
        let directive = config
            .as_ref()
            .map(Config::log_directive)
            .unwrap_or("info");
        EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(config),
        Some(Command::CheckDb) => cmd_check_db(config).await,
        Some(Command::Serve { port }) => cmd_serve(config, port.or(args.port)).await,
        None => cmd_serve(config, args.port).await,
    }
}

/// Load and validate configuration.
fn load_config() -> Result<Config, AppError> {
    let config = Config::load()?;
    config.validate().map_err(AppError::InvalidConfig)?;
    Ok(config)
}

/// Check configuration validity.
fn cmd_check_config(config: Result<Config, AppError>) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("PATIENT DIRECTORY - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match config {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration check failed"));
        }
    };

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Database: {}@{}:{}/{}", config.db_username, config.db_host, config.db_port, config.db_name);
    println!("  Password: {}", if config.db_password.is_empty() { "not set" } else { "set" });
    println!("  Connection Limit: {}", config.db_connection_limit);
    match config.db_acquire_timeout_secs {
        Some(secs) => println!("  Acquire Timeout: {}s", secs),
        None => println!(
            "  Acquire Timeout: {}s (default)",
            DEFAULT_ACQUIRE_TIMEOUT.as_secs()
        ),
    }
    println!("  Port: {}", config.port);
    println!("  Search Mode: {}", config.search_mode);
    println!("  Log Filter: {}", config.log_directive());
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Check that the database is reachable.
async fn cmd_check_db(config: Result<Config, AppError>) -> anyhow::Result<()> {
    let config = config?;
    let store = MySqlStore::connect(&config.database());

    let ok = check_connectivity(&store, STARTUP_CHECK_TIMEOUT).await;
    store.close_within(POOL_CLOSE_TIMEOUT).await;

    if ok {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Database connectivity check failed"))
    }
}

/// Serve the API until shutdown.
async fn cmd_serve(
    config: Result<Config, AppError>,
    port_override: Option<u16>,
) -> anyhow::Result<()> {
    let mut config = config.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Some(port) = port_override {
        config.port = port;
    }

    info!(
        "Database {}@{}:{}/{} (connection limit {})",
        config.db_username, config.db_host, config.db_port, config.db_name, config.db_connection_limit
    );
    info!("Search mode: {}", config.search_mode);

    let store = Arc::new(MySqlStore::connect(&config.database()));

    // Runs alongside the listener; a failed check is only logged.
    let startup_check = spawn_connectivity_check(store.clone(), STARTUP_CHECK_TIMEOUT);

    let state = AppState::new(store.clone(), config.search_mode);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await.map_err(AppError::from)?;

    serve(listener, state, shutdown_signal()).await?;

    startup_check.abort();
    store.close_within(POOL_CLOSE_TIMEOUT).await;
    info!("Server stopped");
    Ok(())
}
