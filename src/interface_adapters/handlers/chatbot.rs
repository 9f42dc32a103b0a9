use axum::{Json, extract::State, http::HeaderMap};
use tracing::{debug, warn};

use crate::domain::entities::SessionDraft;
use crate::domain::ports::Clock;
use crate::interface_adapters::handlers::resolve_identity;
use crate::interface_adapters::protocol::{ChatbotRequest, ChatbotResponse};
use crate::interface_adapters::state::{AppState, SystemClock};
use crate::use_cases::dialogue::{BookingDialogue, DialogueTurn};

pub const SESSION_HEADER: &str = "x-session-id";

// Handler for one chatbot turn.
pub async fn chatbot(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ChatbotRequest>,
) -> Json<ChatbotResponse> {
    let session_id = session_id(&headers);
    let identity = resolve_identity(&state, &headers).await;

    // Held until the updated draft is stored.
    let _turn = state.session_locks.acquire(&session_id).await;

    let clock = SystemClock;
    let today = clock.today();
    let SessionDraft { mut draft, step } = match state.drafts.load(&session_id).await {
        Ok(session) => session.unwrap_or_default(),
        Err(err) => {
            warn!(error = %err, %session_id, "failed to load session draft");
            SessionDraft::default()
        }
    };
    if let Some(echo) = payload.booking_data.as_ref() {
        draft.backfill_from(&echo.to_draft(today));
    }

    let action = payload.to_action(today, step);
    debug!(%session_id, ?action, stage = ?draft.stage(), "chatbot turn");

    let use_case = BookingDialogue {
        clock,
        store: state.bookings.clone(),
        settings: state.settings.clone(),
    };
    let response = use_case
        .execute(DialogueTurn {
            action,
            draft,
            identity,
        })
        .await;

    // A pending typed-input step is kept even when the draft is still empty.
    let session = SessionDraft {
        draft: response.draft.clone(),
        step: response.step,
    };
    let stored = if session.is_empty() {
        state.drafts.clear(&session_id).await
    } else {
        state.drafts.save(&session_id, session).await
    };
    if let Err(err) = stored {
        warn!(error = %err, %session_id, "failed to store session draft");
    }

    Json(ChatbotResponse::from_dialogue(response, session_id))
}

fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
