use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::entities::{
    Booking, Identity, NewBooking, PaymentStatus, PaymentType, SessionDraft,
};
use crate::domain::ports::{BookingStore, Clock, DraftStore, IdentityProvider, Reservation};
use crate::use_cases::types::BookingSettings;

// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<dyn BookingStore>,
    pub drafts: Arc<dyn DraftStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub session_locks: SessionLocks,
    pub settings: Arc<BookingSettings>,
}

impl AppState {
    // Fully in-memory wiring used when no database is configured and in tests.
    pub fn in_memory(settings: BookingSettings, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            bookings: Arc::new(InMemoryBookingStore::default()),
            drafts: Arc::new(InMemoryDraftStore::default()),
            identity,
            session_locks: SessionLocks::default(),
            settings: Arc::new(settings),
        }
    }
}

#[derive(Default)]
struct BookingLedger {
    rows: Vec<Booking>,
    // Ids are never reused after a cancellation.
    last_id: i64,
}

// Newest visit first, then slot order within a day.
fn sort_for_listing(bookings: &mut [Booking]) {
    bookings.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.time_slot.cmp(&b.time_slot)));
}

// In-memory booking store; one mutex serializes capacity checks and inserts.
#[derive(Clone, Default)]
pub struct InMemoryBookingStore {
    ledger: Arc<Mutex<BookingLedger>>,
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn booked_visitors(&self, date: NaiveDate) -> Result<HashMap<String, u32>, String> {
        let ledger = self.ledger.lock().await;
        let mut booked = HashMap::new();
        for booking in ledger.rows.iter().filter(|booking| booking.date == date) {
            *booked.entry(booking.time_slot.clone()).or_insert(0) += booking.visitors;
        }
        Ok(booked)
    }

    async fn reserve(&self, booking: NewBooking, capacity: u32) -> Result<Reservation, String> {
        let mut ledger = self.ledger.lock().await;
        let booked: u32 = ledger
            .rows
            .iter()
            .filter(|existing| existing.date == booking.date && existing.time_slot == booking.time_slot)
            .map(|existing| existing.visitors)
            .sum();
        if booked + booking.visitors > capacity {
            return Ok(Reservation::Insufficient {
                available: capacity.saturating_sub(booked),
            });
        }

        ledger.last_id += 1;
        let saved = Booking {
            id: ledger.last_id,
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
        ledger.rows.push(saved.clone());
        Ok(Reservation::Created(saved))
    }

    async fn get(&self, id: i64) -> Result<Option<Booking>, String> {
        let ledger = self.ledger.lock().await;
        Ok(ledger.rows.iter().find(|booking| booking.id == id).cloned())
    }

    async fn update_payment(
        &self,
        id: i64,
        status: PaymentStatus,
        method: Option<PaymentType>,
    ) -> Result<Option<Booking>, String> {
        let mut ledger = self.ledger.lock().await;
        Ok(ledger.rows.iter_mut().find(|booking| booking.id == id).map(|booking| {
            booking.payment_status = status;
            booking.payment_method = method;
            booking.clone()
        }))
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Booking>, String> {
        let ledger = self.ledger.lock().await;
        let mut owned: Vec<Booking> = ledger
            .rows
            .iter()
            .filter(|booking| booking.user_id == Some(user_id))
            .cloned()
            .collect();
        sort_for_listing(&mut owned);
        Ok(owned)
    }

    async fn cancel(&self, id: i64) -> Result<Option<Booking>, String> {
        let mut ledger = self.ledger.lock().await;
        let position = ledger.rows.iter().position(|booking| booking.id == id);
        Ok(position.map(|index| ledger.rows.remove(index)))
    }
}

// PostgreSQL-backed booking store.
#[derive(Clone)]
pub struct PostgresBookingStore {
    pub db: PgPool,
}

const BOOKING_COLUMNS: &str = "id, user_id, date, time_slot, visitors, amount_cents, currency, payment_status, payment_method, created_at";

fn booking_from_row(row: &PgRow) -> Result<Booking, sqlx::Error> {
    let visitors: i32 = row.try_get("visitors")?;
    let amount_cents: i64 = row.try_get("amount_cents")?;
    let payment_status: String = row.try_get("payment_status")?;
    let payment_method: Option<String> = row.try_get("payment_method")?;
    Ok(Booking {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        date: row.try_get("date")?,
        time_slot: row.try_get("time_slot")?,
        visitors: u32::try_from(visitors).unwrap_or_default(),
        amount_cents: u64::try_from(amount_cents).unwrap_or_default(),
        currency: row.try_get("currency")?,
        payment_status: PaymentStatus::from_db(&payment_status),
        payment_method: payment_method.as_deref().and_then(PaymentType::parse),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn booked_visitors(&self, date: NaiveDate) -> Result<HashMap<String, u32>, String> {
        let rows = sqlx::query(
            r#"
            SELECT time_slot, COALESCE(SUM(visitors), 0)::BIGINT AS booked
            FROM bookings
            WHERE date = $1
            GROUP BY time_slot
            "#,
        )
        .bind(date)
        .fetch_all(&self.db)
        .await
        .map_err(|err| err.to_string())?;

        rows.iter()
            .map(|row| -> Result<(String, u32), sqlx::Error> {
                let time_slot: String = row.try_get("time_slot")?;
                let booked: i64 = row.try_get("booked")?;
                Ok((time_slot, u32::try_from(booked).unwrap_or(u32::MAX)))
            })
            .collect::<Result<HashMap<_, _>, _>>()
            .map_err(|err| err.to_string())
    }

    async fn reserve(&self, booking: NewBooking, capacity: u32) -> Result<Reservation, String> {
        let mut tx = self.db.begin().await.map_err(|err| err.to_string())?;

        // Serializes concurrent reservations for the same date and slot until commit.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("{}/{}", booking.date, booking.time_slot))
            .execute(&mut *tx)
            .await
            .map_err(|err| err.to_string())?;

        let booked: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(visitors), 0)::BIGINT FROM bookings WHERE date = $1 AND time_slot = $2",
        )
        .bind(booking.date)
        .bind(&booking.time_slot)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| err.to_string())?;

        let booked = u32::try_from(booked).unwrap_or(u32::MAX);
        if booked.saturating_add(booking.visitors) > capacity {
            tx.rollback().await.map_err(|err| err.to_string())?;
            return Ok(Reservation::Insufficient {
                available: capacity.saturating_sub(booked),
            });
        }

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO bookings
                (user_id, date, time_slot, visitors, amount_cents, currency, payment_status, payment_method, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking.user_id)
        .bind(booking.date)
        .bind(&booking.time_slot)
        .bind(i32::try_from(booking.visitors).map_err(|err| err.to_string())?)
        .bind(i64::try_from(booking.amount_cents).map_err(|err| err.to_string())?)
        .bind(&booking.currency)
        .bind(booking.payment_status.as_str())
        .bind(booking.payment_method.map(|method| method.as_str()))
        .bind(booking.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| err.to_string())?;

        let saved = booking_from_row(&row).map_err(|err| err.to_string())?;
        tx.commit().await.map_err(|err| err.to_string())?;
        Ok(Reservation::Created(saved))
    }

    async fn get(&self, id: i64) -> Result<Option<Booking>, String> {
        let row = sqlx::query(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(|err| err.to_string())?;

        row.as_ref()
            .map(booking_from_row)
            .transpose()
            .map_err(|err| err.to_string())
    }

    async fn update_payment(
        &self,
        id: i64,
        status: PaymentStatus,
        method: Option<PaymentType>,
    ) -> Result<Option<Booking>, String> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE bookings
            SET payment_status = $2, payment_method = $3
            WHERE id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(method.map(|method| method.as_str()))
        .fetch_optional(&self.db)
        .await
        .map_err(|err| err.to_string())?;

        row.as_ref()
            .map(booking_from_row)
            .transpose()
            .map_err(|err| err.to_string())
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Booking>, String> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY date DESC, time_slot"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(|err| err.to_string())?;

        rows.iter()
            .map(booking_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| err.to_string())
    }

    async fn cancel(&self, id: i64) -> Result<Option<Booking>, String> {
        let row = sqlx::query(&format!(
            "DELETE FROM bookings WHERE id = $1 RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|err| err.to_string())?;

        row.as_ref()
            .map(booking_from_row)
            .transpose()
            .map_err(|err| err.to_string())
    }
}

struct StoredDraft {
    session: SessionDraft,
    touched_at: Instant,
}

// In-memory session draft store.
#[derive(Clone, Default)]
pub struct InMemoryDraftStore {
    drafts: Arc<Mutex<HashMap<String, StoredDraft>>>,
}

impl InMemoryDraftStore {
    // Drop drafts that have not been touched within `max_idle`.
    pub async fn prune(&self, max_idle: Duration) -> usize {
        let mut drafts = self.drafts.lock().await;
        let before = drafts.len();
        drafts.retain(|_, stored| stored.touched_at.elapsed() < max_idle);
        before - drafts.len()
    }
}

#[async_trait]
impl DraftStore for InMemoryDraftStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionDraft>, String> {
        let drafts = self.drafts.lock().await;
        Ok(drafts.get(session_id).map(|stored| stored.session.clone()))
    }

    async fn save(&self, session_id: &str, session: SessionDraft) -> Result<(), String> {
        let mut drafts = self.drafts.lock().await;
        drafts.insert(
            session_id.to_string(),
            StoredDraft {
                session,
                touched_at: Instant::now(),
            },
        );
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<(), String> {
        let mut drafts = self.drafts.lock().await;
        drafts.remove(session_id);
        Ok(())
    }
}

/// Per-session turn locks.
///
/// A turn holds its session's lock from draft load to draft save, so two
/// requests for the same session never interleave. Different sessions do not
/// contend beyond the short map lookup.
#[derive(Clone, Default)]
pub struct SessionLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl SessionLocks {
    pub async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    // Forget locks nobody is holding or waiting on.
    pub async fn prune_idle(&self) -> usize {
        let mut locks = self.locks.lock().await;
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }
}

// Identity provider backed by a fixed token table from configuration.
#[derive(Clone, Default)]
pub struct StaticTokenIdentityProvider {
    pub tokens: HashMap<String, Identity>,
}

#[async_trait]
impl IdentityProvider for StaticTokenIdentityProvider {
    async fn resolve(&self, token: &str) -> Result<Option<Identity>, String> {
        Ok(self.tokens.get(token).cloned())
    }
}

// System clock adapter; bookable dates follow the server's local calendar.
#[derive(Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
