use chrono::NaiveDate;

use crate::domain::entities::{SlotAvailability, TimeSlot};
use crate::domain::errors::DialogueError;
use crate::domain::ports::BookingStore;

// Per-slot availability query for a single date.
pub struct AvailabilityUseCase<'a, S> {
    pub store: &'a S,
    pub slots: &'a [TimeSlot],
}

impl<S> AvailabilityUseCase<'_, S>
where
    S: BookingStore,
{
    pub async fn execute(&self, date: NaiveDate) -> Result<Vec<SlotAvailability>, DialogueError> {
        let booked = self
            .store
            .booked_visitors(date)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, %date, "failed to load slot occupancy");
                DialogueError::StorageFailure
            })?;

        Ok(self
            .slots
            .iter()
            .map(|slot| SlotAvailability::new(slot, booked.get(&slot.id).copied().unwrap_or(0)))
            .collect())
    }

    // Availability for one slot, or None when the slot id is not in the catalog.
    pub async fn for_slot(
        &self,
        date: NaiveDate,
        slot_id: &str,
    ) -> Result<Option<SlotAvailability>, DialogueError> {
        let all = self.execute(date).await?;
        Ok(all.into_iter().find(|slot| slot.time_slot == slot_id))
    }
}
