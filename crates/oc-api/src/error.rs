use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid API token")]
    Unauthorized,

    #[error("upstream error: {0}")]
    Upstream(String),
}

impl From<hetzner_api::Error> for ApiError {
    fn from(e: hetzner_api::Error) -> Self {
        match e {
            hetzner_api::Error::Auth => ApiError::Unauthorized,
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_variants() {
        let cases = [
            (
                ApiError::BadRequest("serverId must be a positive integer".into()),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                ApiError::Upstream("connection reset".into()),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn rejected_token_maps_to_unauthorized() {
        let error = ApiError::from(hetzner_api::Error::Auth);
        assert_eq!(error.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
