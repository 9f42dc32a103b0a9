use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};

use crate::domain::errors::DialogueError;
use crate::interface_adapters::handlers::{error_response, resolve_identity};
use crate::interface_adapters::protocol::{
    BookingView, BookingsResponse, CancelResponse, ErrorResponse,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::bookings::{CancelBookingUseCase, MyBookingsUseCase};

fn map_error(err: DialogueError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        DialogueError::AuthenticationRequired => {
            error_response(StatusCode::UNAUTHORIZED, "authentication required")
        }
        DialogueError::BookingNotFound => error_response(StatusCode::NOT_FOUND, "booking not found"),
        DialogueError::StorageFailure => {
            error_response(StatusCode::BAD_GATEWAY, "booking storage unavailable")
        }
        _ => error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
    }
}

// Handler listing the caller's bookings.
pub async fn list_bookings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BookingsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let identity = resolve_identity(&state, &headers).await;

    let use_case = MyBookingsUseCase {
        store: &state.bookings,
    };
    let bookings = use_case.execute(identity.as_ref()).await.map_err(map_error)?;

    Ok(Json(BookingsResponse {
        bookings: bookings.into_iter().map(BookingView::from).collect(),
    }))
}

// Handler cancelling one of the caller's bookings.
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<CancelResponse>, (StatusCode, Json<ErrorResponse>)> {
    let identity = resolve_identity(&state, &headers).await;

    let use_case = CancelBookingUseCase {
        store: &state.bookings,
    };
    let booking = use_case
        .execute(booking_id, identity.as_ref())
        .await
        .map_err(map_error)?;

    Ok(Json(CancelResponse {
        message: format!("Booking #{} cancelled.", booking.id),
        booking: BookingView::from(booking),
    }))
}
