use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::utils::DeepSearchError;

/// Any failure before the response stream starts. Always rendered as
/// HTTP 500 with `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError(pub DeepSearchError);

impl<E> From<E> for ApiError
where
    E: Into<DeepSearchError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.0.to_string();
        error!("chat route error: {}", message);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": message })),
        )
            .into_response()
    }
}
