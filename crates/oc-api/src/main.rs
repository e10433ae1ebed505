mod config;
mod dto;
mod error;
mod routes;
mod state;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use hetzner_api::HetznerClient;
use oc_provision::{CloudApi, Provisioner};

use crate::config::AppConfig;
use crate::routes::api_router;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let api: Arc<dyn CloudApi> = Arc::new(HetznerClient::new(config.hetzner_api_base.clone()));
    let provisioner = Provisioner::new(api.clone(), config.provision_settings());

    let state = AppState { api, provisioner };

    // The wizard front-end is served separately, so CORS stays open.
    let app = api_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .expect("failed to bind listener");

    tracing::info!(addr = %config.listen_addr, "starting setup API");

    axum::serve(listener, app).await.expect("server error");
}
