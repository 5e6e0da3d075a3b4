//! Polbind API Server
//!
//! Serves project policy binding, policy and local identity endpoints over
//! REST with OpenAPI documentation.
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings (0.0.0.0:8080)
//! cargo run
//!
//! # Start on custom host and port
//! cargo run -- --host 127.0.0.1 --port 9090
//!
//! # Enable debug logging
//! RUST_LOG=debug cargo run
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Logging level (trace, debug, info, warn, error)
//! - `POLBIND_HOST`: Server host (default: 0.0.0.0)
//! - `POLBIND_PORT`: Server port (default: 8080)
//! - `POLBIND_JSON_LOGS`: JSON log output
//! - `DATABASE_URL`: PostgreSQL binding store (requires the `postgres` feature)
//! - `POLBIND_POLICY_PREFIX`, `POLBIND_POLICIES_KEY`, `POLBIND_EVALUATOR_DOMAIN`,
//!   `POLBIND_UPDATE_CONFLICT_RETRIES`: engine configuration

use anyhow::Result;
use api_server::{server::ServerBuilder, state::AppState};
use clap::Parser;
use polbind_authz::EngineConfig;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Polbind API Server
#[derive(Parser, Debug)]
#[command(
    name = "polbind-server",
    version,
    about = "REST API server for project policy bindings",
    long_about = None
)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "POLBIND_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short = 'p', long, default_value = "8080", env = "POLBIND_PORT")]
    port: u16,

    /// Enable JSON logging format
    #[arg(long, env = "POLBIND_JSON_LOGS")]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// PostgreSQL URL for binding records; in-memory when unset
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args);

    info!("Starting Polbind API Server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = EngineConfig::from_env()?;

    let state = Arc::new(build_state(config, args.database_url.as_deref()).await?);

    let server = ServerBuilder::new()
        .host(&args.host)
        .port(args.port)
        .state(state)
        .build()?;

    if let Err(e) = server.run().await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn build_state(config: EngineConfig, database_url: Option<&str>) -> Result<AppState> {
    match database_url {
        None => {
            info!("Binding store: in-memory");
            Ok(AppState::in_memory(config).await?)
        }
        #[cfg(feature = "postgres")]
        Some(url) => {
            info!("Binding store: PostgreSQL");
            Ok(AppState::with_postgres(config, url).await?)
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => anyhow::bail!("--database-url needs polbind-server built with the `postgres` feature"),
    }
}

/// Default filter when `RUST_LOG` holds a bare level
fn default_filter(level: tracing::Level) -> String {
    let deps = if level <= tracing::Level::INFO { "info" } else { "debug" };
    format!(
        "api_server={lvl},polbind_authz={lvl},tower_http={deps},axum={deps}",
        lvl = level,
        deps = deps
    )
}

fn init_tracing(args: &Args) {
    let log_level = args.log_level.parse::<tracing::Level>().unwrap_or_else(|_| {
        eprintln!("Invalid log level '{}', using 'info'", args.log_level);
        tracing::Level::INFO
    });

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(log_level).into());

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}
