use crate::interface_adapters::handlers::{
    availability::availability,
    bookings::{cancel_booking, list_bookings},
    chatbot::chatbot,
};
use crate::interface_adapters::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/chatbot", post(chatbot))
        .route("/api/availability/{date}", get(availability))
        .route("/api/bookings", get(list_bookings))
        .route("/api/bookings/{id}/cancel", post(cancel_booking))
        .with_state(state)
}
