//! Bookstore API server: reads settings from the environment, prepares the schema, serves HTTP.

use bookstore_api::config::log_filter;
use bookstore_api::{app, apply_migrations, connect, ensure_database_exists, AppState, Settings};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(settings.server.debug, std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    tracing::info!(bind_addr = %settings.server.bind_addr, debug = settings.server.debug, "starting");

    if settings.database.create_if_missing {
        if let Err(e) = ensure_database_exists(&settings.database.url).await {
            tracing::warn!(error = %e, "could not ensure database exists; connecting anyway");
        }
    }
    let pool = connect(&settings.database).await?;
    let tables = apply_migrations(&pool, settings.database.reset_schema_on_startup).await?;
    tracing::info!(tables = tables.len(), "schema applied");

    let bind_addr = settings.server.bind_addr;
    let state = AppState::new(pool.clone(), settings);
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("database connections closed");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
    tracing::info!("shutdown signal received");
}
