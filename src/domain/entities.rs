use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Payment choice offered at the end of the booking dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Online,
    Cash,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Online => "online",
            PaymentType::Cash => "cash",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "online" => Some(PaymentType::Online),
            "cash" => Some(PaymentType::Cash),
            _ => None,
        }
    }
}

// Dialogue stage derived from which draft fields are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueStage {
    AwaitDate,
    AwaitTime,
    AwaitVisitors,
    AwaitPaymentChoice,
}

/// In-progress booking accumulated across dialogue turns.
///
/// Fields fill strictly in order: date, time slot, visitor count, payment
/// type. The setters clear every later field so the order cannot be broken
/// by re-selecting an earlier step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingDraft {
    pub date: Option<NaiveDate>,
    pub time_slot: Option<String>,
    pub visitor_count: Option<u32>,
    pub payment_type: Option<PaymentType>,
}

impl BookingDraft {
    pub fn stage(&self) -> DialogueStage {
        match (&self.date, &self.time_slot, &self.visitor_count) {
            (None, _, _) => DialogueStage::AwaitDate,
            (Some(_), None, _) => DialogueStage::AwaitTime,
            (Some(_), Some(_), None) => DialogueStage::AwaitVisitors,
            (Some(_), Some(_), Some(_)) => DialogueStage::AwaitPaymentChoice,
        }
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = Some(date);
        self.time_slot = None;
        self.visitor_count = None;
        self.payment_type = None;
    }

    pub fn set_time_slot(&mut self, time_slot: String) {
        self.time_slot = Some(time_slot);
        self.visitor_count = None;
        self.payment_type = None;
    }

    pub fn set_visitor_count(&mut self, visitor_count: u32) {
        self.visitor_count = Some(visitor_count);
        self.payment_type = None;
    }

    // Ignored until the visitor count is known.
    pub fn set_payment_type(&mut self, payment_type: PaymentType) {
        if self.visitor_count.is_some() {
            self.payment_type = Some(payment_type);
        }
    }

    /// Fill absent fields from a lower-priority fragment without touching
    /// values already present. The result is truncated at the first gap so
    /// the fill order still holds.
    pub fn backfill_from(&mut self, fragment: &BookingDraft) {
        if self.date.is_none() {
            self.date = fragment.date;
        }
        if self.time_slot.is_none() {
            self.time_slot = fragment.time_slot.clone();
        }
        if self.visitor_count.is_none() {
            self.visitor_count = fragment.visitor_count;
        }
        if self.payment_type.is_none() {
            self.payment_type = fragment.payment_type;
        }
        self.truncate_at_gap();
    }

    pub fn truncate_at_gap(&mut self) {
        if self.date.is_none() {
            self.time_slot = None;
        }
        if self.time_slot.is_none() {
            self.visitor_count = None;
        }
        if self.visitor_count.is_none() {
            self.payment_type = None;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == BookingDraft::default()
    }
}

/// One bookable time slot in the daily catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: String,
    pub label: String,
    pub capacity: u32,
}

// Remaining capacity for one slot on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    pub time_slot: String,
    pub label: String,
    pub capacity: u32,
    pub booked: u32,
    pub remaining: u32,
    pub is_full: bool,
}

impl SlotAvailability {
    pub fn new(slot: &TimeSlot, booked: u32) -> Self {
        Self {
            time_slot: slot.id.clone(),
            label: slot.label.clone(),
            capacity: slot.capacity,
            booked,
            remaining: slot.capacity.saturating_sub(booked),
            is_full: booked >= slot.capacity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    CashPending,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::CashPending => "cash_pending",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "cash_pending" => PaymentStatus::CashPending,
            _ => PaymentStatus::Pending,
        }
    }
}

// Booking fields validated and priced, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub user_id: Option<i64>,
    pub date: NaiveDate,
    pub time_slot: String,
    pub visitors: u32,
    pub amount_cents: u64,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentType>,
    pub created_at: DateTime<Utc>,
}

/// Persisted booking record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Booking {
    pub id: i64,
    pub user_id: Option<i64>,
    pub date: NaiveDate,
    pub time_slot: String,
    pub visitors: u32,
    pub amount_cents: u64,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentType>,
    pub created_at: DateTime<Utc>,
}

// Authenticated caller resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub display_name: String,
}

/// Client-side action names carried by affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionName {
    StartBooking,
    SelectDate,
    CustomDate,
    SelectTime,
    SelectVisitors,
    CustomVisitors,
    ConfirmAndPay,
    CheckAvailability,
    BookFromAvailability,
    ChangeToCash,
    PayOnline,
    ViewBookings,
    Login,
}

/// A client-renderable button for one legal next action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affordance {
    pub label: String,
    pub action: ActionName,
    pub value: Option<String>,
    pub url: Option<String>,
    pub booking_id: Option<i64>,
    pub payment_type: Option<PaymentType>,
    pub date: Option<String>,
    pub time_slot: Option<String>,
}

impl Affordance {
    pub fn new(label: impl Into<String>, action: ActionName) -> Self {
        Self {
            label: label.into(),
            action,
            value: None,
            url: None,
            booking_id: None,
            payment_type: None,
            date: None,
            time_slot: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_booking(mut self, booking_id: i64) -> Self {
        self.booking_id = Some(booking_id);
        self
    }

    pub fn with_payment_type(mut self, payment_type: PaymentType) -> Self {
        self.payment_type = Some(payment_type);
        self
    }

    pub fn with_slot(mut self, date: impl Into<String>, time_slot: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self.time_slot = Some(time_slot.into());
        self
    }
}

// Prompt the client should route the next free-text message to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputStep {
    CustomDateInput,
    CustomVisitorsInput,
}

/// Conversation state kept server-side between turns of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDraft {
    pub draft: BookingDraft,
    // Typed-input prompt still waiting for an answer.
    pub step: Option<InputStep>,
}

impl SessionDraft {
    pub fn is_empty(&self) -> bool {
        self.draft.is_empty() && self.step.is_none()
    }
}

/// Outcome of one dialogue turn.
#[derive(Debug, Clone, Default)]
pub struct DialogueResponse {
    pub text: String,
    pub buttons: Vec<Affordance>,
    pub draft: BookingDraft,
    pub success: bool,
    pub error: bool,
    pub requires_login: bool,
    pub payment_required: bool,
    pub step: Option<InputStep>,
    pub booking: Option<Booking>,
}

impl DialogueResponse {
    pub fn reply(text: impl Into<String>, draft: BookingDraft) -> Self {
        Self {
            text: text.into(),
            draft,
            ..Self::default()
        }
    }

    pub fn failure(text: impl Into<String>, draft: BookingDraft) -> Self {
        Self {
            text: text.into(),
            draft,
            error: true,
            ..Self::default()
        }
    }

    pub fn with_buttons(mut self, buttons: Vec<Affordance>) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn with_step(mut self, step: InputStep) -> Self {
        self.step = Some(step);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn when_date_is_reselected_then_later_fields_are_cleared() {
        let mut draft = BookingDraft::default();
        draft.set_date(date(2026, 11, 1));
        draft.set_time_slot("10:00".to_string());
        draft.set_visitor_count(2);

        draft.set_date(date(2026, 11, 2));

        assert_eq!(draft.date, Some(date(2026, 11, 2)));
        assert_eq!(draft.time_slot, None);
        assert_eq!(draft.visitor_count, None);
        assert_eq!(draft.stage(), DialogueStage::AwaitTime);
    }

    #[test]
    fn when_backfilling_then_present_fields_win_over_fragment() {
        let mut draft = BookingDraft {
            date: Some(date(2026, 11, 1)),
            ..BookingDraft::default()
        };
        let fragment = BookingDraft {
            date: Some(date(2027, 1, 1)),
            time_slot: Some("11:00".to_string()),
            visitor_count: Some(3),
            payment_type: None,
        };

        draft.backfill_from(&fragment);

        assert_eq!(draft.date, Some(date(2026, 11, 1)));
        assert_eq!(draft.time_slot.as_deref(), Some("11:00"));
        assert_eq!(draft.visitor_count, Some(3));
        assert_eq!(draft.stage(), DialogueStage::AwaitPaymentChoice);
    }

    #[test]
    fn when_fragment_skips_a_field_then_later_fields_are_dropped() {
        let mut draft = BookingDraft::default();
        let fragment = BookingDraft {
            date: None,
            time_slot: Some("11:00".to_string()),
            visitor_count: Some(3),
            payment_type: Some(PaymentType::Cash),
        };

        draft.backfill_from(&fragment);

        assert!(draft.is_empty());
    }

    #[test]
    fn when_payment_type_is_set_before_visitors_then_it_is_ignored() {
        let mut draft = BookingDraft {
            date: Some(date(2026, 11, 1)),
            time_slot: Some("10:00".to_string()),
            ..BookingDraft::default()
        };

        draft.set_payment_type(PaymentType::Cash);
        assert_eq!(draft.payment_type, None);

        draft.set_visitor_count(2);
        draft.set_payment_type(PaymentType::Cash);
        assert_eq!(draft.payment_type, Some(PaymentType::Cash));
    }

    #[test]
    fn when_only_a_step_is_pending_then_session_is_not_empty() {
        let session = SessionDraft {
            draft: BookingDraft::default(),
            step: Some(InputStep::CustomDateInput),
        };

        assert!(!session.is_empty());
        assert!(SessionDraft::default().is_empty());
    }

    #[test]
    fn when_booked_meets_capacity_then_slot_is_full() {
        let slot = TimeSlot {
            id: "09:00".to_string(),
            label: "09:00–10:00".to_string(),
            capacity: 20,
        };

        let open = SlotAvailability::new(&slot, 12);
        let full = SlotAvailability::new(&slot, 25);

        assert_eq!(open.remaining, 8);
        assert!(!open.is_full);
        assert_eq!(full.remaining, 0);
        assert!(full.is_full);
    }
}
