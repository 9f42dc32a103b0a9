//! Booking dialogue controller.
//!
//! Each turn is a function of the incoming action, the draft threaded in by
//! the caller and availability data from the booking store. The controller
//! keeps nothing between turns. Only `confirm_and_pay` and `change_to_cash`
//! write to the store.

use chrono::{Duration, NaiveDate};
use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::domain::entities::{
    ActionName, Affordance, BookingDraft, DialogueResponse, DialogueStage, Identity, InputStep,
    NewBooking, PaymentStatus, PaymentType, SlotAvailability,
};
use crate::domain::errors::DialogueError;
use crate::domain::ports::{BookingStore, Clock, Reservation};
use crate::use_cases::availability::AvailabilityUseCase;
use crate::use_cases::dates::{display_date, find_date_token, parse_bookable_date, short_date};
use crate::use_cases::intent::{Intent, classify};
use crate::use_cases::knowledge;
use crate::use_cases::types::BookingSettings;

static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+").expect("number pattern is valid"));

/// One variant per action a client may send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueAction {
    StartBooking,
    SelectDate(String),
    CustomDate,
    SelectTime(String),
    SelectVisitors(String),
    CustomVisitors,
    ConfirmAndPay {
        // None defers to the draft's recorded choice, then online.
        payment_type: Option<PaymentType>,
        // Top-level request fields used as the last backfill source.
        fallback: BookingDraft,
    },
    CheckAvailability(String),
    BookFromAvailability {
        date: String,
        time_slot: String,
    },
    ChangeToCash(Option<i64>),
    FreeText {
        message: String,
        step: Option<InputStep>,
    },
    Empty,
}

// Input for a single dialogue turn.
#[derive(Debug, Clone)]
pub struct DialogueTurn {
    pub action: DialogueAction,
    /// Server session draft already backfilled from the client echo.
    pub draft: BookingDraft,
    pub identity: Option<Identity>,
}

// Booking dialogue use case with injected dependencies.
pub struct BookingDialogue<C, S> {
    pub clock: C,
    pub store: S,
    pub settings: Arc<BookingSettings>,
}

impl<C, S> BookingDialogue<C, S>
where
    C: Clock,
    S: BookingStore,
{
    pub async fn execute(&self, turn: DialogueTurn) -> DialogueResponse {
        let DialogueTurn {
            action,
            draft,
            identity,
        } = turn;

        match action {
            DialogueAction::StartBooking => self.start_booking(),
            DialogueAction::SelectDate(value) => self.select_date(&value, draft).await,
            DialogueAction::CustomDate => self.custom_date(draft),
            DialogueAction::SelectTime(value) => self.select_time(&value, draft).await,
            DialogueAction::SelectVisitors(value) => self.select_visitors(&value, draft).await,
            DialogueAction::CustomVisitors => self.custom_visitors(draft),
            DialogueAction::ConfirmAndPay {
                payment_type,
                fallback,
            } => {
                self.confirm_and_pay(payment_type, draft, &fallback, identity.as_ref())
                    .await
            }
            DialogueAction::CheckAvailability(value) => {
                self.check_availability(&value, draft).await
            }
            DialogueAction::BookFromAvailability { date, time_slot } => {
                self.book_from_availability(&date, &time_slot, draft).await
            }
            DialogueAction::ChangeToCash(booking_id) => {
                self.change_to_cash(booking_id, draft, identity.as_ref()).await
            }
            DialogueAction::FreeText { message, step } => {
                self.free_text(&message, step, draft).await
            }
            DialogueAction::Empty => {
                DialogueResponse::failure("Please provide a message or action.", draft)
            }
        }
    }

    fn start_booking(&self) -> DialogueResponse {
        DialogueResponse::reply(
            "Great! Let's book your ticket step by step!\n\nStep 1: Select Date\n\nWhen would you like to visit?",
            BookingDraft::default(),
        )
        .with_buttons(self.date_buttons())
    }

    async fn select_date(&self, value: &str, draft: BookingDraft) -> DialogueResponse {
        let date = match parse_bookable_date(value, self.clock.today()) {
            Ok(date) => date,
            Err(err) => return self.date_error(err, draft),
        };

        let slots = match self.availability(date).await {
            Ok(slots) => slots,
            Err(err) => return self.reprompt(err, draft).await,
        };

        let open: Vec<&SlotAvailability> = slots.iter().filter(|slot| !slot.is_full).collect();
        if open.is_empty() {
            let next_week = date + Duration::days(7);
            return DialogueResponse::failure(
                format!(
                    "All slots are full for {}.\n\nWould you like to try another date?",
                    display_date(date)
                ),
                draft,
            )
            .with_buttons(vec![
                Affordance::new("Try Tomorrow", ActionName::SelectDate).with_value("tomorrow"),
                Affordance::new("Try Next Week", ActionName::SelectDate)
                    .with_value(next_week.to_string()),
                Affordance::new("Start Over", ActionName::StartBooking),
            ]);
        }

        let mut draft = draft;
        draft.set_date(date);
        DialogueResponse::reply(
            format!(
                "Date selected: {}\n\nStep 2: Select Time Slot\n\nAvailable time slots:",
                display_date(date)
            ),
            draft,
        )
        .with_buttons(slot_buttons(&open))
    }

    fn custom_date(&self, draft: BookingDraft) -> DialogueResponse {
        DialogueResponse::reply(
            "Please enter the date in YYYY-MM-DD format (e.g. 2026-12-25), or type 'today' or 'tomorrow'.",
            draft,
        )
        .with_step(InputStep::CustomDateInput)
    }

    async fn select_time(&self, value: &str, draft: BookingDraft) -> DialogueResponse {
        let Some(date) = draft.date else {
            return self.date_error_with("Please select a date first.", draft);
        };

        let slot = match self.open_slot(date, value.trim()).await {
            Ok(slot) => slot,
            Err(err) => return self.reprompt(err, draft).await,
        };

        let mut draft = draft;
        draft.set_time_slot(slot.time_slot.clone());
        DialogueResponse::reply(
            format!(
                "Time slot selected: {}\n\nStep 3: Number of Visitors\n\nHow many visitors? (Maximum {} per booking)",
                slot.label, self.settings.max_visitors_per_booking
            ),
            draft,
        )
        .with_buttons(visitor_buttons())
    }

    async fn select_visitors(&self, value: &str, draft: BookingDraft) -> DialogueResponse {
        let (Some(date), Some(time_slot)) = (draft.date, draft.time_slot.clone()) else {
            return self.reprompt(DialogueError::IncompleteDraft, draft).await;
        };

        let visitors = match self.parse_visitor_count(value) {
            Ok(visitors) => visitors,
            Err(err) => {
                return DialogueResponse::failure(err.message(), draft)
                    .with_buttons(visitor_buttons());
            }
        };

        let slot = match self.open_slot(date, &time_slot).await {
            Ok(slot) => slot,
            Err(err @ (DialogueError::SlotFull | DialogueError::UnknownTimeSlot)) => {
                // Back to slot selection with whatever is still open that day.
                let mut draft = draft;
                draft.set_date(date);
                return self.reprompt(err, draft).await;
            }
            Err(err) => return self.reprompt(err, draft).await,
        };
        if visitors > slot.remaining {
            let err = DialogueError::CapacityExceeded {
                available: slot.remaining,
            };
            return DialogueResponse::failure(err.message(), draft).with_buttons(vec![
                Affordance::new("Fewer Visitors", ActionName::CustomVisitors),
                Affordance::new("Choose Different Slot", ActionName::SelectDate)
                    .with_value(date.to_string()),
            ]);
        }

        let amount = self.settings.price_for(visitors);
        let mut draft = draft;
        draft.set_visitor_count(visitors);
        DialogueResponse::reply(
            format!(
                "Booking Summary\n\nDate: {}\nTime Slot: {}\nVisitors: {}\nTotal Amount: {}\n\nStep 4: Confirm & Pay\n\nReady to confirm your booking?",
                display_date(date),
                slot.label,
                visitors,
                self.settings.format_amount(amount)
            ),
            draft,
        )
        .with_buttons(payment_buttons())
    }

    fn custom_visitors(&self, draft: BookingDraft) -> DialogueResponse {
        DialogueResponse::reply(
            format!(
                "Please enter the number of visitors (1-{}).",
                self.settings.max_visitors_per_booking
            ),
            draft,
        )
        .with_step(InputStep::CustomVisitorsInput)
        .with_buttons(
            (1..=5)
                .map(|count| {
                    Affordance::new(count.to_string(), ActionName::SelectVisitors)
                        .with_value(count.to_string())
                })
                .collect(),
        )
    }

    async fn confirm_and_pay(
        &self,
        payment_type: Option<PaymentType>,
        draft: BookingDraft,
        fallback: &BookingDraft,
        identity: Option<&Identity>,
    ) -> DialogueResponse {
        let mut draft = draft;
        draft.backfill_from(fallback);

        let (Some(date), Some(time_slot), Some(visitors)) =
            (draft.date, draft.time_slot.clone(), draft.visitor_count)
        else {
            return DialogueResponse::failure(DialogueError::IncompleteDraft.message(), draft)
                .with_buttons(vec![Affordance::new(
                    "Start New Booking",
                    ActionName::StartBooking,
                )]);
        };

        // Recovered fragments are untrusted, so every step is re-validated.
        if let Err(err) = parse_bookable_date(&date.to_string(), self.clock.today()) {
            return self.date_error(err, BookingDraft::default());
        }
        let Some(slot) = self.settings.slot(&time_slot).cloned() else {
            let mut draft = draft;
            draft.set_date(date);
            return self.reprompt(DialogueError::UnknownTimeSlot, draft).await;
        };
        if let Err(err) = self.parse_visitor_count(&visitors.to_string()) {
            let mut draft = draft;
            draft.set_time_slot(time_slot);
            return DialogueResponse::failure(err.message(), draft).with_buttons(visitor_buttons());
        }

        let payment_type = payment_type
            .or(draft.payment_type)
            .unwrap_or(PaymentType::Online);
        draft.set_payment_type(payment_type);

        if self.settings.require_login && identity.is_none() {
            return DialogueResponse {
                requires_login: true,
                buttons: vec![
                    Affordance::new("Log In", ActionName::Login).with_url(&self.settings.login_url),
                ],
                ..DialogueResponse::reply(DialogueError::AuthenticationRequired.message(), draft)
            };
        }

        let amount_cents = self.settings.price_for(visitors);
        let (payment_status, payment_method) = match payment_type {
            PaymentType::Cash => (PaymentStatus::CashPending, Some(PaymentType::Cash)),
            PaymentType::Online => (PaymentStatus::Pending, None),
        };
        let new_booking = NewBooking {
            user_id: identity.map(|identity| identity.user_id),
            date,
            time_slot: time_slot.clone(),
            visitors,
            amount_cents,
            currency: self.settings.currency.clone(),
            payment_status,
            payment_method,
            created_at: self.clock.now(),
        };

        let booking = match self.store.reserve(new_booking, slot.capacity).await {
            Ok(Reservation::Created(booking)) => booking,
            Ok(Reservation::Insufficient { available }) => {
                let err = DialogueError::CapacityExceeded { available };
                return DialogueResponse::failure(
                    format!(
                        "{}\n\nWould you like to choose a different time slot?",
                        err.message()
                    ),
                    draft,
                )
                .with_buttons(vec![
                    Affordance::new("Choose Different Slot", ActionName::SelectDate)
                        .with_value(date.to_string()),
                    Affordance::new("Start Over", ActionName::StartBooking),
                ]);
            }
            Err(err) => {
                tracing::error!(error = %err, %date, time_slot = %time_slot, "failed to persist booking");
                return DialogueResponse::failure(DialogueError::StorageFailure.message(), draft)
                    .with_buttons(payment_buttons());
            }
        };

        tracing::info!(
            booking_id = booking.id,
            user_id = ?booking.user_id,
            %date,
            time_slot = %time_slot,
            visitors,
            payment_type = payment_type.as_str(),
            "booking created"
        );

        let amount = self.settings.format_amount(booking.amount_cents);
        let pay_online = Affordance::new(format!("Pay Online Now ({amount})"), ActionName::PayOnline)
            .with_booking(booking.id)
            .with_url(format!("/payment/{}", booking.id));
        let view_bookings =
            Affordance::new("View All Bookings", ActionName::ViewBookings).with_url("/api/bookings");
        let details = format!(
            "Booking ID: #{}\nDate: {}\nTime Slot: {}\nVisitors: {}\nAmount: {}",
            booking.id,
            display_date(date),
            slot.label,
            visitors,
            amount
        );

        let response = match payment_type {
            PaymentType::Cash => DialogueResponse::reply(
                format!(
                    "Booking Confirmed!\n\n{details}\nPayment: Cash at Museum\n\nPlease bring {amount} in cash and show booking ID #{} at the entrance. Arrive on time for your slot!",
                    booking.id
                ),
                BookingDraft::default(),
            )
            .with_buttons(vec![pay_online, view_bookings]),
            PaymentType::Online => DialogueResponse {
                payment_required: true,
                ..DialogueResponse::reply(
                    format!("Booking Created!\n\n{details}\n\nComplete your payment:"),
                    BookingDraft::default(),
                )
            }
            .with_buttons(vec![
                pay_online,
                Affordance::new("Pay Later (Cash)", ActionName::ChangeToCash)
                    .with_booking(booking.id),
                view_bookings,
            ]),
        };

        DialogueResponse {
            success: true,
            booking: Some(booking),
            ..response
        }
    }

    async fn check_availability(&self, value: &str, draft: BookingDraft) -> DialogueResponse {
        let date = match parse_bookable_date(value, self.clock.today()) {
            Ok(date) => date,
            Err(err) => {
                return DialogueResponse::failure(err.message(), draft)
                    .with_buttons(self.availability_date_buttons(self.clock.today()));
            }
        };

        let slots = match self.availability(date).await {
            Ok(slots) => slots,
            Err(err) => return DialogueResponse::failure(err.message(), draft),
        };

        let mut text = format!("Availability for {}:\n\n", display_date(date));
        for slot in &slots {
            if slot.is_full {
                text.push_str(&format!("• {}: Full\n", slot.label));
            } else {
                text.push_str(&format!(
                    "• {}: Available ({} spots left)\n",
                    slot.label, slot.remaining
                ));
            }
        }

        let open: Vec<&SlotAvailability> = slots.iter().filter(|slot| !slot.is_full).collect();
        if open.is_empty() {
            text.push_str("\nAll slots are full for this date. Please try another date.");
            return DialogueResponse::reply(text, draft)
                .with_buttons(self.availability_date_buttons(date));
        }

        text.push_str("\nWould you like to book one of these slots?");
        let mut buttons: Vec<Affordance> = open
            .iter()
            .map(|slot| {
                Affordance::new(
                    format!("{} ({} spots)", slot.label, slot.remaining),
                    ActionName::BookFromAvailability,
                )
                .with_slot(date.to_string(), slot.time_slot.clone())
            })
            .collect();
        buttons.push(Affordance::new("Start New Booking", ActionName::StartBooking));

        DialogueResponse::reply(text, draft).with_buttons(buttons)
    }

    async fn book_from_availability(
        &self,
        date: &str,
        time_slot: &str,
        draft: BookingDraft,
    ) -> DialogueResponse {
        let date = match parse_bookable_date(date, self.clock.today()) {
            Ok(date) => date,
            Err(err) => return self.date_error(err, draft),
        };

        let mut fresh = BookingDraft::default();
        fresh.set_date(date);
        let slot = match self.open_slot(date, time_slot.trim()).await {
            Ok(slot) => slot,
            Err(err) => return self.reprompt(err, fresh).await,
        };
        fresh.set_time_slot(slot.time_slot.clone());

        DialogueResponse::reply(
            format!(
                "Great choice! {} on {}\n\nStep 3: Number of Visitors\n\nHow many visitors? (Maximum {} per booking)",
                slot.label,
                display_date(date),
                self.settings.max_visitors_per_booking
            ),
            fresh,
        )
        .with_buttons(visitor_buttons())
    }

    async fn change_to_cash(
        &self,
        booking_id: Option<i64>,
        draft: BookingDraft,
        identity: Option<&Identity>,
    ) -> DialogueResponse {
        let not_found = |draft| DialogueResponse::failure(DialogueError::BookingNotFound.message(), draft);
        let Some(booking_id) = booking_id else {
            return not_found(draft);
        };

        let booking = match self.store.get(booking_id).await {
            Ok(Some(booking)) => booking,
            Ok(None) => return not_found(draft),
            Err(err) => {
                tracing::warn!(error = %err, booking_id, "failed to load booking");
                return DialogueResponse::failure(DialogueError::StorageFailure.message(), draft);
            }
        };

        match (booking.user_id, identity) {
            (Some(owner), Some(identity)) if owner == identity.user_id => {}
            (None, _) if !self.settings.require_login => {}
            (Some(_), None) => {
                return DialogueResponse {
                    requires_login: true,
                    buttons: vec![
                        Affordance::new("Log In", ActionName::Login)
                            .with_url(&self.settings.login_url),
                    ],
                    ..DialogueResponse::reply(
                        DialogueError::AuthenticationRequired.message(),
                        draft,
                    )
                };
            }
            _ => return not_found(draft),
        }

        let updated = match self
            .store
            .update_payment(booking_id, PaymentStatus::CashPending, Some(PaymentType::Cash))
            .await
        {
            Ok(Some(updated)) => updated,
            Ok(None) => return not_found(draft),
            Err(err) => {
                tracing::warn!(error = %err, booking_id, "failed to update payment method");
                return DialogueResponse::failure(DialogueError::StorageFailure.message(), draft);
            }
        };

        tracing::info!(booking_id, "payment method changed to cash");
        let amount = self.settings.format_amount(updated.amount_cents);
        DialogueResponse {
            success: true,
            booking: Some(updated),
            ..DialogueResponse::reply(
                format!(
                    "Payment method changed to Cash!\n\nYou can pay {amount} in cash when you visit. Show booking ID #{booking_id} at the entrance."
                ),
                draft,
            )
        }
    }

    async fn free_text(
        &self,
        message: &str,
        step: Option<InputStep>,
        draft: BookingDraft,
    ) -> DialogueResponse {
        if message.trim().is_empty() {
            return DialogueResponse::failure("Please provide a message or action.", draft);
        }

        match step {
            Some(InputStep::CustomDateInput) => match find_date_token(message) {
                Some(token) => self.select_date(&token, draft).await,
                None => DialogueResponse::failure(DialogueError::InvalidDate.message(), draft)
                    .with_step(InputStep::CustomDateInput)
                    .with_buttons(vec![
                        Affordance::new("Today", ActionName::SelectDate).with_value("today"),
                        Affordance::new("Tomorrow", ActionName::SelectDate).with_value("tomorrow"),
                        Affordance::new("Start Over", ActionName::StartBooking),
                    ]),
            },
            Some(InputStep::CustomVisitorsInput) => match FIRST_NUMBER.find(message) {
                Some(number) => self.select_visitors(number.as_str(), draft).await,
                None => DialogueResponse::failure(
                    DialogueError::InvalidVisitorCount {
                        max: self.settings.max_visitors_per_booking,
                    }
                    .message(),
                    draft,
                )
                .with_step(InputStep::CustomVisitorsInput)
                .with_buttons(visitor_buttons()),
            },
            None => match classify(message) {
                Intent::StartBooking => self.start_booking(),
                Intent::CheckAvailability { date } => self.check_availability(&date, draft).await,
                Intent::Question => {
                    DialogueResponse::reply(knowledge::answer(message, &self.settings), draft)
                }
            },
        }
    }

    fn parse_visitor_count(&self, value: &str) -> Result<u32, DialogueError> {
        let max = self.settings.max_visitors_per_booking;
        match value.trim().parse::<i64>() {
            Ok(count) if count >= 1 && count <= i64::from(max) => Ok(count as u32),
            _ => Err(DialogueError::InvalidVisitorCount { max }),
        }
    }

    async fn availability(&self, date: NaiveDate) -> Result<Vec<SlotAvailability>, DialogueError> {
        AvailabilityUseCase {
            store: &self.store,
            slots: &self.settings.slots,
        }
        .execute(date)
        .await
    }

    // Slot that exists in the catalog and still has room on `date`.
    async fn open_slot(&self, date: NaiveDate, slot_id: &str) -> Result<SlotAvailability, DialogueError> {
        let slot = AvailabilityUseCase {
            store: &self.store,
            slots: &self.settings.slots,
        }
        .for_slot(date, slot_id)
        .await?
        .ok_or(DialogueError::UnknownTimeSlot)?;

        if slot.is_full {
            return Err(DialogueError::SlotFull);
        }
        Ok(slot)
    }

    // Error response that re-offers the affordances of the draft's current stage.
    async fn reprompt(&self, err: DialogueError, draft: BookingDraft) -> DialogueResponse {
        let buttons = match draft.stage() {
            DialogueStage::AwaitDate => self.date_buttons(),
            DialogueStage::AwaitTime => {
                let date = draft.date.unwrap_or_else(|| self.clock.today());
                match self.availability(date).await {
                    Ok(slots) => {
                        let open: Vec<&SlotAvailability> =
                            slots.iter().filter(|slot| !slot.is_full).collect();
                        if open.is_empty() {
                            self.date_buttons()
                        } else {
                            slot_buttons(&open)
                        }
                    }
                    Err(_) => self.date_buttons(),
                }
            }
            DialogueStage::AwaitVisitors => visitor_buttons(),
            DialogueStage::AwaitPaymentChoice => payment_buttons(),
        };

        DialogueResponse::failure(err.message(), draft).with_buttons(buttons)
    }

    fn date_error(&self, err: DialogueError, draft: BookingDraft) -> DialogueResponse {
        self.date_error_with(&err.message(), draft)
    }

    fn date_error_with(&self, message: &str, draft: BookingDraft) -> DialogueResponse {
        DialogueResponse::failure(message, draft).with_buttons(self.date_buttons())
    }

    fn date_buttons(&self) -> Vec<Affordance> {
        let today = self.clock.today();
        let tomorrow = today + Duration::days(1);
        let next_week = today + Duration::days(7);
        vec![
            Affordance::new(format!("Today ({})", short_date(today)), ActionName::SelectDate)
                .with_value("today"),
            Affordance::new(format!("Tomorrow ({})", short_date(tomorrow)), ActionName::SelectDate)
                .with_value("tomorrow"),
            Affordance::new(format!("Next Week ({})", short_date(next_week)), ActionName::SelectDate)
                .with_value(next_week.to_string()),
            Affordance::new("Choose Another Date", ActionName::CustomDate),
        ]
    }

    fn availability_date_buttons(&self, from: NaiveDate) -> Vec<Affordance> {
        let tomorrow = self.clock.today() + Duration::days(1);
        let next_week = from + Duration::days(7);
        let check = |label: &str, date: NaiveDate| {
            let mut button = Affordance::new(label, ActionName::CheckAvailability);
            button.date = Some(date.to_string());
            button
        };
        vec![
            check("Try Tomorrow", tomorrow),
            check("Try Next Week", next_week),
            Affordance::new("Start Booking", ActionName::StartBooking),
        ]
    }
}

fn slot_buttons(open: &[&SlotAvailability]) -> Vec<Affordance> {
    open.iter()
        .map(|slot| {
            Affordance::new(
                format!("{} ({} spots)", slot.label, slot.remaining),
                ActionName::SelectTime,
            )
            .with_value(slot.time_slot.clone())
        })
        .collect()
}

fn visitor_buttons() -> Vec<Affordance> {
    let mut buttons: Vec<Affordance> = (1..=4)
        .map(|count| {
            let label = if count == 1 {
                "1 Visitor".to_string()
            } else {
                format!("{count} Visitors")
            };
            Affordance::new(label, ActionName::SelectVisitors).with_value(count.to_string())
        })
        .collect();
    buttons.push(Affordance::new("5+ Visitors", ActionName::CustomVisitors));
    buttons
}

fn payment_buttons() -> Vec<Affordance> {
    vec![
        Affordance::new("Pay Online Now", ActionName::ConfirmAndPay)
            .with_payment_type(PaymentType::Online),
        Affordance::new("Pay Later (Cash)", ActionName::ConfirmAndPay)
            .with_payment_type(PaymentType::Cash),
        Affordance::new("Edit Booking", ActionName::StartBooking),
    ]
}
