use crate::domain::entities::{Booking, Identity};
use crate::domain::errors::DialogueError;
use crate::domain::ports::BookingStore;

// Bookings belonging to the signed-in caller.
pub struct MyBookingsUseCase<'a, S> {
    pub store: &'a S,
}

impl<S> MyBookingsUseCase<'_, S>
where
    S: BookingStore,
{
    pub async fn execute(&self, identity: Option<&Identity>) -> Result<Vec<Booking>, DialogueError> {
        let identity = identity.ok_or(DialogueError::AuthenticationRequired)?;

        self.store
            .list_for_user(identity.user_id)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, user_id = identity.user_id, "failed to list bookings");
                DialogueError::StorageFailure
            })
    }
}

/// Cancels a booking on behalf of its owner.
///
/// Guest bookings and bookings owned by someone else report
/// `BookingNotFound`, the same as ids that do not exist.
pub struct CancelBookingUseCase<'a, S> {
    pub store: &'a S,
}

impl<S> CancelBookingUseCase<'_, S>
where
    S: BookingStore,
{
    pub async fn execute(
        &self,
        booking_id: i64,
        identity: Option<&Identity>,
    ) -> Result<Booking, DialogueError> {
        let identity = identity.ok_or(DialogueError::AuthenticationRequired)?;

        let booking = self
            .store
            .get(booking_id)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, booking_id, "failed to load booking");
                DialogueError::StorageFailure
            })?
            .ok_or(DialogueError::BookingNotFound)?;
        if booking.user_id != Some(identity.user_id) {
            return Err(DialogueError::BookingNotFound);
        }

        let cancelled = self
            .store
            .cancel(booking_id)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, booking_id, "failed to cancel booking");
                DialogueError::StorageFailure
            })?
            .ok_or(DialogueError::BookingNotFound)?;

        tracing::info!(booking_id, user_id = identity.user_id, "booking cancelled");
        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::{FailureFlags, RecordingStore, visitor};
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, day).expect("valid date")
    }

    #[tokio::test]
    async fn when_caller_is_anonymous_then_listing_requires_login() {
        let store = RecordingStore::new();
        let use_case = MyBookingsUseCase { store: &store };

        let result = use_case.execute(None).await;

        assert_eq!(result, Err(DialogueError::AuthenticationRequired));
    }

    #[tokio::test]
    async fn when_owner_lists_then_own_bookings_come_back_latest_first() {
        let store = RecordingStore::new();
        store.seed_booking(date(2), "10:00", 2);
        store.seed_booking(date(9), "09:00", 1);
        let use_case = MyBookingsUseCase { store: &store };

        let mine = use_case
            .execute(Some(&visitor(99)))
            .await
            .expect("expected bookings");
        let theirs = use_case
            .execute(Some(&visitor(7)))
            .await
            .expect("expected bookings");

        assert_eq!(mine.iter().map(|booking| booking.id).collect::<Vec<_>>(), vec![2, 1]);
        assert!(theirs.is_empty());
    }

    #[tokio::test]
    async fn when_owner_cancels_then_booking_is_removed() {
        let store = RecordingStore::new();
        let booking = store.seed_booking(date(2), "10:00", 2);
        let use_case = CancelBookingUseCase { store: &store };

        let cancelled = use_case
            .execute(booking.id, Some(&visitor(99)))
            .await
            .expect("expected cancellation");

        assert_eq!(cancelled, booking);
        assert!(store.saved_bookings().is_empty());
    }

    #[tokio::test]
    async fn when_someone_else_cancels_then_booking_is_not_found_and_kept() {
        let store = RecordingStore::new();
        let booking = store.seed_booking(date(2), "10:00", 2);
        let use_case = CancelBookingUseCase { store: &store };

        let stranger = use_case.execute(booking.id, Some(&visitor(7))).await;
        let missing = use_case.execute(42, Some(&visitor(99))).await;
        let anonymous = use_case.execute(booking.id, None).await;

        assert_eq!(stranger, Err(DialogueError::BookingNotFound));
        assert_eq!(missing, Err(DialogueError::BookingNotFound));
        assert_eq!(anonymous, Err(DialogueError::AuthenticationRequired));
        assert_eq!(store.saved_bookings().len(), 1);
    }

    #[tokio::test]
    async fn when_store_fails_then_cancel_reports_storage_failure() {
        let store = RecordingStore::new();
        let booking = store.seed_booking(date(2), "10:00", 2);
        let store = store.with_failures(FailureFlags {
            update: true,
            ..FailureFlags::default()
        });
        let use_case = CancelBookingUseCase { store: &store };

        let result = use_case.execute(booking.id, Some(&visitor(99))).await;

        assert_eq!(result, Err(DialogueError::StorageFailure));
    }
}
