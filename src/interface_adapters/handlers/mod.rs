pub mod availability;
pub mod bookings;
pub mod chatbot;

use axum::{
    Json,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
};
use tracing::warn;

use crate::domain::entities::Identity;
use crate::interface_adapters::protocol::ErrorResponse;
use crate::interface_adapters::state::AppState;

// Helper to build a JSON error response.
pub(crate) fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            message: message.to_string(),
        }),
    )
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// Unknown tokens and verification failures both fall back to an anonymous caller.
pub(crate) async fn resolve_identity(state: &AppState, headers: &HeaderMap) -> Option<Identity> {
    let token = bearer_token(headers)?;
    match state.identity.resolve(token).await {
        Ok(identity) => identity,
        Err(err) => {
            warn!(error = %err, "identity resolution failed; continuing anonymously");
            None
        }
    }
}
