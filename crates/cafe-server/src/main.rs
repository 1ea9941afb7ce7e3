mod bootstrap;
mod config;

use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use cafe_api::AppState;
use cafe_db::Database;

use crate::config::{Config, DEV_SECRET, DatabaseTarget};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cafe_server=debug,cafe_api=debug,cafe_db=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.secret_key == DEV_SECRET {
        warn!("SECRET_KEY is unset, session cookies are signed with a development key");
    }

    // Init database
    let db = match &config.database {
        DatabaseTarget::File(path) => Database::open(path)?,
        DatabaseTarget::Memory => Database::open_in_memory()?,
    };

    let pruned = db.prune_expired_sessions(chrono::Utc::now())?;
    if pruned > 0 {
        info!("Pruned {} expired sessions", pruned);
    }

    if let Some(admin) = &config.admin {
        bootstrap::ensure_admin(&db, admin)?;
    }

    let state = AppState::new(db, &config.secret_key, config.session.clone());

    let app = cafe_api::router(state)
        .route_service("/favicon.ico", ServeFile::new(config.favicon_path()))
        .layer(TraceLayer::new_for_http());

    info!("Cafe directory listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
