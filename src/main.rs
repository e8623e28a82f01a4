//! Duel arena binary entrypoint wiring REST routes, storage supervision and the sweeper.

use std::{env, net::SocketAddr};

use anyhow::Context;
use axum::Router;
use duel_arena::{
    config::AppConfig,
    dao::memory,
    routes,
    services::sweeper,
    state::{AppState, SharedState, leveling::default_level_curve},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::from_config(AppConfig::load());
    start_storage(&app_state).await?;
    tokio::spawn(sweeper::run(app_state.clone()));

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Install the backend selected by `STORAGE_BACKEND` (`mongo` by default, or `memory`).
async fn start_storage(state: &SharedState) -> anyhow::Result<()> {
    let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "mongo".into());
    match backend.trim().to_ascii_lowercase().as_str() {
        "memory" => {
            warn!("using in-memory storage; data is lost on restart");
            state
                .install_backend(memory::backend(default_level_curve))
                .await;
            Ok(())
        }
        "mongo" => start_mongo(state),
        other => anyhow::bail!("unknown STORAGE_BACKEND `{other}`"),
    }
}

#[cfg(feature = "mongo-store")]
fn start_mongo(state: &SharedState) -> anyhow::Result<()> {
    use duel_arena::{
        dao::{
            mongodb::{MongoConfig, connect},
            storage::StorageError,
        },
        services::storage_supervisor,
    };

    let uri = env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
    let db_name = env::var("MONGO_DB").ok();

    tokio::spawn(storage_supervisor::run(state.clone(), move || {
        let uri = uri.clone();
        let db_name = db_name.clone();
        async move {
            let config = MongoConfig::from_uri(&uri, db_name.as_deref()).await?;
            let backend = connect(config, default_level_curve).await?;
            Ok::<_, StorageError>(backend)
        }
    }));
    Ok(())
}

#[cfg(not(feature = "mongo-store"))]
fn start_mongo(_state: &SharedState) -> anyhow::Result<()> {
    anyhow::bail!("built without the `mongo-store` feature; set STORAGE_BACKEND=memory")
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
