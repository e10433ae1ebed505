use std::convert::Infallible;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use oc_provision::{ProvisionEvent, TokenCheck, check_token};

use crate::dto::{CheckRequest, ConsoleRequest, ConsoleResponse, ProvisionRequestBody};
use crate::error::ApiError;
use crate::state::AppState;

/// Validate the token and look for an existing server. Read-only, so the
/// wizard can call it on every page load.
pub async fn check(
    State(state): State<AppState>,
    Json(req): Json<CheckRequest>,
) -> Json<TokenCheck> {
    Json(check_token(state.api.as_ref(), &req.token, &req.server_name).await)
}

/// Run one provisioning attempt, streaming NDJSON progress records as they
/// are produced. The response always ends with exactly one terminal record.
pub async fn provision(
    State(state): State<AppState>,
    Json(req): Json<ProvisionRequestBody>,
) -> Response {
    let (tx, rx) = mpsc::channel::<ProvisionEvent>(32);

    // The attempt runs on its own task: if the client disconnects, it still
    // winds down within its bounded poll budget, and sends onto the closed
    // channel are dropped.
    let provisioner = state.provisioner.clone();
    tokio::spawn(async move {
        provisioner.run(req.into(), tx).await;
    });

    let body = Body::from_stream(
        ReceiverStream::new(rx).map(|event| Ok::<_, Infallible>(event.encode_line())),
    );

    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        body,
    )
        .into_response()
}

/// Request a one-time VNC console session. Fallback access path when the
/// caller has no SSH key on the server.
pub async fn console(
    State(state): State<AppState>,
    Json(req): Json<ConsoleRequest>,
) -> Result<Json<ConsoleResponse>, ApiError> {
    if req.server_id <= 0 {
        return Err(ApiError::BadRequest(
            "serverId must be a positive integer".into(),
        ));
    }

    let access = state.api.request_console(&req.token, req.server_id).await?;
    Ok(Json(ConsoleResponse {
        wss_url: access.wss_url,
        password: access.password,
    }))
}
