pub mod setup;

use axum::Router;
use axum::routing::post;

use crate::state::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/api/check", post(setup::check))
        .route("/api/provision", post(setup::provision))
        .route("/api/console", post(setup::console))
        .with_state(state)
}
