use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::entities::{
    ActionName, Affordance, Booking, BookingDraft, DialogueResponse, InputStep, PaymentStatus,
    PaymentType, SlotAvailability,
};
use crate::use_cases::dates::parse_date;
use crate::use_cases::dialogue::DialogueAction;

// Scalar that clients send either as a JSON number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LooseValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl LooseValue {
    pub fn to_text(&self) -> String {
        match self {
            LooseValue::Int(value) => value.to_string(),
            LooseValue::Float(value) => value.to_string(),
            LooseValue::Text(value) => value.clone(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            LooseValue::Int(value) => Some(*value),
            LooseValue::Float(_) => None,
            LooseValue::Text(value) => value.trim().trim_start_matches('#').parse().ok(),
        }
    }
}

/// Client-echoed draft. Every field is optional and malformed fragments are
/// dropped rather than rejected, since the echo is only a recovery hint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftPayload {
    pub date: Option<Value>,
    pub time_slot: Option<Value>,
    #[serde(alias = "visitors")]
    pub visitor_count: Option<Value>,
    pub payment_type: Option<Value>,
}

impl DraftPayload {
    pub fn to_draft(&self, today: NaiveDate) -> BookingDraft {
        let text = |value: &Option<Value>| match value {
            Some(Value::String(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
            _ => None,
        };

        let visitor_count = match &self.visitor_count {
            Some(Value::Number(number)) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
            Some(Value::String(text)) => text.trim().parse::<u32>().ok(),
            _ => None,
        }
        .filter(|count| *count > 0);

        let mut draft = BookingDraft {
            date: text(&self.date).and_then(|value| parse_date(&value, today).ok()),
            time_slot: text(&self.time_slot),
            visitor_count,
            payment_type: text(&self.payment_type).and_then(|value| PaymentType::parse(&value)),
        };
        draft.truncate_at_gap();
        draft
    }
}

// Request payload for one chatbot turn.
#[derive(Debug, Default, Deserialize)]
pub struct ChatbotRequest {
    pub message: Option<String>,
    pub action: Option<String>,
    pub value: Option<LooseValue>,
    pub date: Option<String>,
    pub time_slot: Option<String>,
    pub visitors: Option<LooseValue>,
    pub payment_type: Option<String>,
    pub booking_id: Option<LooseValue>,
    pub booking_data: Option<DraftPayload>,
    pub step: Option<String>,
}

impl ChatbotRequest {
    /// Map the loosely typed wire request onto a dialogue action.
    ///
    /// `session_step` is the typed-input prompt the session is still waiting
    /// on. A `step` sent with the request takes precedence over it.
    pub fn to_action(&self, today: NaiveDate, session_step: Option<InputStep>) -> DialogueAction {
        let value = self.value.as_ref().map(LooseValue::to_text);
        let pick = |primary: Option<String>, secondary: Option<String>| {
            primary
                .filter(|text| !text.trim().is_empty())
                .or(secondary)
                .unwrap_or_default()
        };

        match self.action.as_deref().map(str::trim) {
            Some("start_booking") => DialogueAction::StartBooking,
            Some("select_date") => DialogueAction::SelectDate(pick(value, self.date.clone())),
            Some("custom_date") => DialogueAction::CustomDate,
            Some("select_time") => DialogueAction::SelectTime(pick(value, self.time_slot.clone())),
            Some("select_visitors") => DialogueAction::SelectVisitors(pick(
                value,
                self.visitors.as_ref().map(LooseValue::to_text),
            )),
            Some("custom_visitors") => DialogueAction::CustomVisitors,
            Some("confirm_and_pay") => {
                let payment_type = self
                    .payment_type
                    .as_deref()
                    .or(value.as_deref())
                    .and_then(PaymentType::parse);
                let fallback = DraftPayload {
                    date: self.date.clone().map(Value::String),
                    time_slot: self.time_slot.clone().map(Value::String),
                    visitor_count: self
                        .visitors
                        .as_ref()
                        .map(|visitors| Value::String(visitors.to_text())),
                    payment_type: None,
                }
                .to_draft(today);
                DialogueAction::ConfirmAndPay {
                    payment_type,
                    fallback,
                }
            }
            Some("check_availability") => {
                DialogueAction::CheckAvailability(pick(self.date.clone(), value))
            }
            Some("book_from_availability") => DialogueAction::BookFromAvailability {
                date: self.date.clone().unwrap_or_default(),
                time_slot: pick(self.time_slot.clone(), value),
            },
            Some("change_to_cash") => DialogueAction::ChangeToCash(
                self.booking_id
                    .as_ref()
                    .or(self.value.as_ref())
                    .and_then(LooseValue::as_i64),
            ),
            _ => {
                let message = self.message.as_deref().unwrap_or_default().trim();
                if message.is_empty() {
                    DialogueAction::Empty
                } else {
                    DialogueAction::FreeText {
                        message: message.to_string(),
                        step: self.input_step().or(session_step),
                    }
                }
            }
        }
    }

    fn input_step(&self) -> Option<InputStep> {
        match self.step.as_deref() {
            Some("custom_date_input") => Some(InputStep::CustomDateInput),
            Some("custom_visitors_input") => Some(InputStep::CustomVisitorsInput),
            _ => None,
        }
    }
}

// Draft as returned to the client for re-submission on the next turn.
#[derive(Debug, Serialize)]
pub struct DraftView {
    pub date: Option<String>,
    pub time_slot: Option<String>,
    pub visitor_count: Option<u32>,
    pub payment_type: Option<PaymentType>,
}

impl From<&BookingDraft> for DraftView {
    fn from(draft: &BookingDraft) -> Self {
        Self {
            date: draft.date.map(|date| date.to_string()),
            time_slot: draft.time_slot.clone(),
            visitor_count: draft.visitor_count,
            payment_type: draft.payment_type,
        }
    }
}

// Button rendered by the chat client.
#[derive(Debug, Serialize)]
pub struct AffordanceView {
    pub text: String,
    pub action: ActionName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<PaymentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_slot: Option<String>,
}

impl From<Affordance> for AffordanceView {
    fn from(affordance: Affordance) -> Self {
        Self {
            text: affordance.label,
            action: affordance.action,
            value: affordance.value,
            url: affordance.url,
            booking_id: affordance.booking_id,
            payment_type: affordance.payment_type,
            date: affordance.date,
            time_slot: affordance.time_slot,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingView {
    pub id: i64,
    pub user_id: Option<i64>,
    pub date: String,
    pub time_slot: String,
    pub visitors: u32,
    pub amount_cents: u64,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentType>,
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingView {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            user_id: booking.user_id,
            date: booking.date.to_string(),
            time_slot: booking.time_slot,
            visitors: booking.visitors,
            amount_cents: booking.amount_cents,
            currency: booking.currency,
            payment_status: booking.payment_status,
            payment_method: booking.payment_method,
            created_at: booking.created_at,
        }
    }
}

// Response payload for one chatbot turn.
#[derive(Debug, Serialize)]
pub struct ChatbotResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<AffordanceView>,
    pub booking_data: DraftView,
    pub success: bool,
    pub error: bool,
    pub requires_login: bool,
    pub payment_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<InputStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<BookingView>,
    pub session_id: String,
}

impl ChatbotResponse {
    pub fn from_dialogue(response: DialogueResponse, session_id: String) -> Self {
        Self {
            response: response.text,
            booking_data: DraftView::from(&response.draft),
            buttons: response.buttons.into_iter().map(AffordanceView::from).collect(),
            success: response.success,
            error: response.error,
            requires_login: response.requires_login,
            payment_required: response.payment_required,
            step: response.step,
            booking: response.booking.map(BookingView::from),
            session_id,
        }
    }
}

// Response payload for the booking list API.
#[derive(Debug, Serialize)]
pub struct BookingsResponse {
    pub bookings: Vec<BookingView>,
}

// Response payload for a cancelled booking.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub message: String,
    pub booking: BookingView,
}

// Response payload for the availability API.
#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub date: String,
    pub slots: Vec<SlotAvailability>,
}

// Simple error envelope for JSON responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date")
    }

    fn request(body: Value) -> ChatbotRequest {
        serde_json::from_value(body).expect("expected request to deserialize")
    }

    #[test]
    fn when_select_date_uses_value_then_maps_to_select_date() {
        let action = request(json!({"action": "select_date", "value": "2026-11-02"})).to_action(today(), None);

        assert_eq!(action, DialogueAction::SelectDate("2026-11-02".to_string()));
    }

    #[test]
    fn when_select_date_has_only_top_level_date_then_uses_it() {
        let action = request(json!({"action": "select_date", "date": "tomorrow"})).to_action(today(), None);

        assert_eq!(action, DialogueAction::SelectDate("tomorrow".to_string()));
    }

    #[test]
    fn when_select_visitors_value_is_a_number_then_it_is_stringified() {
        let action = request(json!({"action": "select_visitors", "value": 3})).to_action(today(), None);

        assert_eq!(action, DialogueAction::SelectVisitors("3".to_string()));
    }

    #[test]
    fn when_confirm_has_top_level_fields_then_they_become_the_fallback_draft() {
        let action = request(json!({
            "action": "confirm_and_pay",
            "payment_type": "cash",
            "date": "2026-11-02",
            "time_slot": "10:00",
            "visitors": "2"
        }))
        .to_action(today(), None);

        let DialogueAction::ConfirmAndPay {
            payment_type,
            fallback,
        } = action
        else {
            panic!("expected confirm_and_pay");
        };
        assert_eq!(payment_type, Some(PaymentType::Cash));
        assert_eq!(fallback.date, NaiveDate::from_ymd_opt(2026, 11, 2));
        assert_eq!(fallback.time_slot.as_deref(), Some("10:00"));
        assert_eq!(fallback.visitor_count, Some(2));
    }

    #[test]
    fn when_confirm_names_no_payment_type_then_choice_is_left_to_the_draft() {
        let action = request(json!({"action": "confirm_and_pay"})).to_action(today(), None);

        let DialogueAction::ConfirmAndPay { payment_type, .. } = action else {
            panic!("expected confirm_and_pay");
        };
        assert_eq!(payment_type, None);
    }

    #[test]
    fn when_request_has_no_step_then_session_step_routes_the_text() {
        let from_session = request(json!({"message": "6 people"}))
            .to_action(today(), Some(InputStep::CustomVisitorsInput));
        let from_request = request(json!({"message": "6 people", "step": "custom_date_input"}))
            .to_action(today(), Some(InputStep::CustomVisitorsInput));

        assert_eq!(
            from_session,
            DialogueAction::FreeText {
                message: "6 people".to_string(),
                step: Some(InputStep::CustomVisitorsInput),
            }
        );
        assert_eq!(
            from_request,
            DialogueAction::FreeText {
                message: "6 people".to_string(),
                step: Some(InputStep::CustomDateInput),
            }
        );
    }

    #[test]
    fn when_booking_id_is_a_hash_prefixed_string_then_change_to_cash_parses_it() {
        let action = request(json!({"action": "change_to_cash", "booking_id": "#17"})).to_action(today(), None);

        assert_eq!(action, DialogueAction::ChangeToCash(Some(17)));
    }

    #[test]
    fn when_action_is_unknown_and_message_present_then_maps_to_free_text() {
        let action = request(json!({
            "action": "dance",
            "message": " 2026-11-02 ",
            "step": "custom_date_input"
        }))
        .to_action(today(), None);

        assert_eq!(
            action,
            DialogueAction::FreeText {
                message: "2026-11-02".to_string(),
                step: Some(InputStep::CustomDateInput),
            }
        );
    }

    #[test]
    fn when_nothing_is_provided_then_maps_to_empty() {
        assert_eq!(request(json!({})).to_action(today(), None), DialogueAction::Empty);
    }

    #[test]
    fn when_draft_echo_has_malformed_fragments_then_they_are_dropped() {
        let payload: DraftPayload = serde_json::from_value(json!({
            "date": "not-a-date",
            "time_slot": "10:00",
            "visitors": -4
        }))
        .expect("expected draft to deserialize");

        let draft = payload.to_draft(today());

        assert!(draft.is_empty());
    }

    #[test]
    fn when_draft_echo_uses_visitors_alias_then_count_is_read() {
        let payload: DraftPayload = serde_json::from_value(json!({
            "date": "2026-11-02",
            "time_slot": "10:00",
            "visitors": "3",
            "step": "confirm_booking"
        }))
        .expect("expected draft to deserialize");

        let draft = payload.to_draft(today());

        assert_eq!(draft.visitor_count, Some(3));
        assert_eq!(draft.time_slot.as_deref(), Some("10:00"));
    }
}
