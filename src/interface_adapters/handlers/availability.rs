use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::domain::errors::DialogueError;
use crate::domain::ports::Clock;
use crate::interface_adapters::handlers::error_response;
use crate::interface_adapters::protocol::{AvailabilityResponse, ErrorResponse};
use crate::interface_adapters::state::{AppState, SystemClock};
use crate::use_cases::availability::AvailabilityUseCase;
use crate::use_cases::dates::parse_date;

// Handler for the per-date slot availability listing.
pub async fn availability(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<AvailabilityResponse>, (StatusCode, Json<ErrorResponse>)> {
    let date = parse_date(&date, SystemClock.today())
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "date must be YYYY-MM-DD"))?;

    let use_case = AvailabilityUseCase {
        store: &state.bookings,
        slots: &state.settings.slots,
    };
    let slots = use_case.execute(date).await.map_err(|err| match err {
        DialogueError::StorageFailure => {
            error_response(StatusCode::BAD_GATEWAY, "booking storage unavailable")
        }
        _ => error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
    })?;

    Ok(Json(AvailabilityResponse {
        date: date.to_string(),
        slots,
    }))
}
