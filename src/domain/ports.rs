use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::entities::{
    Booking, Identity, NewBooking, PaymentStatus, PaymentType, SessionDraft,
};

// Result of an atomic capacity check plus insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    Created(Booking),
    Insufficient { available: u32 },
}

// Port for booking persistence and per-slot occupancy.
#[async_trait]
pub trait BookingStore: Send + Sync {
    // Sum of visitors already booked per slot id on the given date.
    async fn booked_visitors(&self, date: NaiveDate) -> Result<HashMap<String, u32>, String>;
    // Insert the booking only if the slot still has room for its visitors.
    async fn reserve(&self, booking: NewBooking, capacity: u32) -> Result<Reservation, String>;
    async fn get(&self, id: i64) -> Result<Option<Booking>, String>;
    async fn update_payment(
        &self,
        id: i64,
        status: PaymentStatus,
        method: Option<PaymentType>,
    ) -> Result<Option<Booking>, String>;
    // Bookings owned by the user, latest visit date first.
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Booking>, String>;
    // Remove the booking, returning it when it existed.
    async fn cancel(&self, id: i64) -> Result<Option<Booking>, String>;
}

// Shared adapters are handed to use cases behind an Arc.
#[async_trait]
impl<T> BookingStore for Arc<T>
where
    T: BookingStore + ?Sized,
{
    async fn booked_visitors(&self, date: NaiveDate) -> Result<HashMap<String, u32>, String> {
        (**self).booked_visitors(date).await
    }

    async fn reserve(&self, booking: NewBooking, capacity: u32) -> Result<Reservation, String> {
        (**self).reserve(booking, capacity).await
    }

    async fn get(&self, id: i64) -> Result<Option<Booking>, String> {
        (**self).get(id).await
    }

    async fn update_payment(
        &self,
        id: i64,
        status: PaymentStatus,
        method: Option<PaymentType>,
    ) -> Result<Option<Booking>, String> {
        (**self).update_payment(id, status, method).await
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Booking>, String> {
        (**self).list_for_user(user_id).await
    }

    async fn cancel(&self, id: i64) -> Result<Option<Booking>, String> {
        (**self).cancel(id).await
    }
}

// Port for server-side session drafts keyed by session id.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<SessionDraft>, String>;
    async fn save(&self, session_id: &str, session: SessionDraft) -> Result<(), String>;
    async fn clear(&self, session_id: &str) -> Result<(), String>;
}

// Port for resolving a bearer token into a caller identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Option<Identity>, String>;
}

// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
    fn now(&self) -> DateTime<Utc>;
}
