use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use postboard_core::{config::PostboardConfig, db};
use server::{router, AppState, Db};

#[derive(Parser, Debug)]
#[command(name = "server", version, about = "Postboard REST API server")]
struct Args {
    /// Path to the config file. Defaults to `~/.postboard/postboard.toml`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides the config
    #[arg(short, long, env = "POSTBOARD_SOCKET")]
    socket: Option<SocketAddr>,

    /// Path to the sqlite Db, overrides the config
    #[arg(long, env = "POSTBOARD_DB", conflicts_with = "temp_db")]
    db: Option<PathBuf>,

    /// Fill the users table with demo users when it is empty
    #[arg(long)]
    seed: bool,

    /// Serve from a fresh, seeded Db in the temp dir that is deleted on exit
    #[arg(long)]
    temp_db: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = PostboardConfig::load(args.config.clone())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    fmt().with_env_filter(filter).init();

    let db_path = if args.temp_db {
        db::generate_temp_db()
    } else {
        args.db.clone().unwrap_or(config.server.db.clone())
    };
    let store = Db::open(&db_path)
        .with_context(|| format!("Unable to open db at {}", db_path.display()))?;
    if args.seed || args.temp_db {
        let seeded = store.call(db::seed_users)?;
        info!(seeded, "Seeded users");
    }

    let socket = args.socket.unwrap_or(config.server.socket);
    let listener = TcpListener::bind(socket)
        .await
        .with_context(|| format!("Unable to bind {socket}"))?;
    info!(db = %db_path.display(), "Listening on {}...", listener.local_addr()?);
    if args.temp_db {
        info!("Press Ctrl-C to stop the server; this also deletes the temp db");
    }

    axum::serve(listener, router(AppState::new(store)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if args.temp_db {
        std::fs::remove_file(&db_path)
            .with_context(|| format!("Unable to remove {}", db_path.display()))?;
        info!(db = %db_path.display(), "Removed temp db");
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(err) => {
                warn!(%err, "Unable to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Terminate signal received, shutting down");
            }
            Err(err) => {
                warn!(%err, "Unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
