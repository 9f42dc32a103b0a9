use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::domain::entities::{Booking, Identity, NewBooking, PaymentStatus, PaymentType};
use crate::domain::ports::{BookingStore, Clock, Reservation};

pub(crate) type BookingTable = Arc<Mutex<Vec<Booking>>>;

// Shared fixed time source for deterministic use-case tests.
pub(crate) struct FixedClock(pub(crate) NaiveDate);

impl FixedClock {
    pub(crate) fn on(year: i32, month: u32, day: u32) -> Self {
        Self(NaiveDate::from_ymd_opt(year, month, day).expect("valid fixed date"))
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }

    fn now(&self) -> DateTime<Utc> {
        let midday = self.0.and_hms_opt(12, 0, 0).expect("valid midday");
        Utc.from_utc_datetime(&midday)
    }
}

#[derive(Clone, Copy, Default)]
pub(crate) struct FailureFlags {
    pub read: bool,
    pub reserve: bool,
    pub update: bool,
}

#[derive(Clone)]
pub(crate) struct RecordingStore {
    bookings: BookingTable,
    last_id: Arc<AtomicI64>,
    failures: FailureFlags,
}

impl RecordingStore {
    pub(crate) fn new() -> Self {
        Self {
            bookings: Arc::new(Mutex::new(Vec::new())),
            last_id: Arc::new(AtomicI64::new(0)),
            failures: FailureFlags::default(),
        }
    }

    pub(crate) fn with_failures(mut self, failures: FailureFlags) -> Self {
        self.failures = failures;
        self
    }

    fn next_id(&self) -> i64 {
        self.last_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    // Occupy seats in a slot without going through the dialogue.
    pub(crate) fn seed_booking(&self, date: NaiveDate, time_slot: &str, visitors: u32) -> Booking {
        let mut guard = self.bookings.lock().expect("bookings mutex poisoned");
        let booking = Booking {
            id: self.next_id(),
            user_id: Some(99),
            date,
            time_slot: time_slot.to_string(),
            visitors,
            amount_cents: 0,
            currency: "USD".to_string(),
            payment_status: PaymentStatus::Pending,
            payment_method: None,
            created_at: Utc::now(),
        };
        guard.push(booking.clone());
        booking
    }

    pub(crate) fn saved_bookings(&self) -> Vec<Booking> {
        self.bookings.lock().expect("bookings mutex poisoned").clone()
    }
}

#[async_trait]
impl BookingStore for RecordingStore {
    async fn booked_visitors(&self, date: NaiveDate) -> Result<HashMap<String, u32>, String> {
        if self.failures.read {
            return Err("read failed".to_string());
        }

        let guard = self.bookings.lock().expect("bookings mutex poisoned");
        let mut booked = HashMap::new();
        for booking in guard.iter().filter(|booking| booking.date == date) {
            *booked.entry(booking.time_slot.clone()).or_insert(0) += booking.visitors;
        }
        Ok(booked)
    }

    async fn reserve(&self, booking: NewBooking, capacity: u32) -> Result<Reservation, String> {
        if self.failures.reserve {
            return Err("reserve failed".to_string());
        }

        let mut guard = self.bookings.lock().expect("bookings mutex poisoned");
        let booked: u32 = guard
            .iter()
            .filter(|existing| existing.date == booking.date && existing.time_slot == booking.time_slot)
            .map(|existing| existing.visitors)
            .sum();
        if booked + booking.visitors > capacity {
            return Ok(Reservation::Insufficient {
                available: capacity.saturating_sub(booked),
            });
        }

        let saved = Booking {
            id: self.next_id(),
            user_id: booking.user_id,
            date: booking.date,
            time_slot: booking.time_slot,
            visitors: booking.visitors,
            amount_cents: booking.amount_cents,
            currency: booking.currency,
            payment_status: booking.payment_status,
            payment_method: booking.payment_method,
            created_at: booking.created_at,
        };
        guard.push(saved.clone());
        Ok(Reservation::Created(saved))
    }

    async fn get(&self, id: i64) -> Result<Option<Booking>, String> {
        if self.failures.read {
            return Err("read failed".to_string());
        }

        let guard = self.bookings.lock().expect("bookings mutex poisoned");
        Ok(guard.iter().find(|booking| booking.id == id).cloned())
    }

    async fn update_payment(
        &self,
        id: i64,
        status: PaymentStatus,
        method: Option<PaymentType>,
    ) -> Result<Option<Booking>, String> {
        if self.failures.update {
            return Err("update failed".to_string());
        }

        let mut guard = self.bookings.lock().expect("bookings mutex poisoned");
        Ok(guard.iter_mut().find(|booking| booking.id == id).map(|booking| {
            booking.payment_status = status;
            booking.payment_method = method;
            booking.clone()
        }))
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Booking>, String> {
        if self.failures.read {
            return Err("read failed".to_string());
        }

        let guard = self.bookings.lock().expect("bookings mutex poisoned");
        let mut owned: Vec<Booking> = guard
            .iter()
            .filter(|booking| booking.user_id == Some(user_id))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.time_slot.cmp(&b.time_slot)));
        Ok(owned)
    }

    async fn cancel(&self, id: i64) -> Result<Option<Booking>, String> {
        if self.failures.update {
            return Err("update failed".to_string());
        }

        let mut guard = self.bookings.lock().expect("bookings mutex poisoned");
        let position = guard.iter().position(|booking| booking.id == id);
        Ok(position.map(|index| guard.remove(index)))
    }
}

pub(crate) fn visitor(user_id: i64) -> Identity {
    Identity {
        user_id,
        display_name: format!("Visitor {user_id}"),
    }
}
