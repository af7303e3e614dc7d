//! LedgerKV Server Binary
//!
//! Opens the data file and starts the TCP server.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use ledgerkv::clock::SystemClock;
use ledgerkv::network::Server;
use ledgerkv::{Config, Engine, SyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// LedgerKV Server
#[derive(Parser, Debug)]
#[command(name = "ledgerkv-server")]
#[command(about = "Append-only log key-value store")]
#[command(version)]
struct Args {
    /// Data file path
    #[arg(long, default_value = "./ledger.db")]
    path: String,

    /// Listen port
    #[arg(short, long, default_value = "9888")]
    port: u16,

    /// Listen host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Connections served at once
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// When to fsync the data file
    #[arg(long, value_enum, default_value = "every-write")]
    sync: SyncMode,

    /// Writes between fsyncs with `--sync batched`
    #[arg(long, default_value = "100")]
    sync_every: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SyncMode {
    EveryWrite,
    Batched,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ledgerkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let sync_strategy = match args.sync {
        SyncMode::EveryWrite => SyncStrategy::EveryWrite,
        SyncMode::Batched => SyncStrategy::EveryNWrites {
            count: args.sync_every,
        },
    };

    let config = Config::builder()
        .data_path(&args.path)
        .listen_addr(format!("{}:{}", args.host, args.port))
        .max_connections(args.max_connections)
        .sync_strategy(sync_strategy)
        .build();

    tracing::info!("LedgerKV Server v{}", ledgerkv::VERSION);
    tracing::info!("Data file: {}", config.data_path.display());
    tracing::info!("Listen address: {}", config.listen_addr);

    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        std::process::exit(2);
    }

    let engine = match Engine::open_with(&config, Arc::new(SystemClock)) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.shutdown();
    }) {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    match Arc::try_unwrap(engine) {
        Ok(engine) => {
            if let Err(e) = engine.close() {
                tracing::error!("Failed to close engine: {}", e);
                std::process::exit(1);
            }
        }
        Err(_) => tracing::warn!("Engine still shared at exit, skipping close"),
    }

    tracing::info!("Server stopped");
}
