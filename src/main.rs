use anyhow::Context;
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{error, info};

use tutoring_portal::{
    api::ApiClient,
    app::create_router,
    app_state::AppState,
    config::{self, StateBackend},
    state::{init_pool, MemoryStateStore, PgStateStore, StateStore},
    telemetry::{init_telemetry, TelemetryConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = config::init().context("Failed to load configuration")?;
    let telemetry = init_telemetry(Some(TelemetryConfig::from_app(config))).await?;

    let store: Arc<dyn StateStore> = match config.state.backend {
        StateBackend::Memory => Arc::new(MemoryStateStore::new()),
        StateBackend::Postgres => {
            let database = config
                .state
                .database
                .as_ref()
                .context("DATABASE_URL must be set when STATE_STORE=postgres")?;
            Arc::new(PgStateStore::new(init_pool(database).await?))
        }
    };
    info!(backend = store.backend(), "Client state store ready");

    let api = ApiClient::new(config.api.base_url.clone(), config.api_timeout());
    info!(base_url = %api.base_url(), "Marketplace API client ready");

    let state = AppState::new(Arc::new(api), store, config.clone());
    let app = create_router(state);

    let addr = config.server_addr();
    info!("{} listening on {}", config.app.name, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to serve application");

    if let Err(e) = telemetry.shutdown().await {
        error!(error = %e, "Telemetry shutdown failed");
    }
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
