// Domain-level errors for the booking dialogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueError {
    InvalidDate,
    DateInPast,
    UnknownTimeSlot,
    SlotFull,
    InvalidVisitorCount { max: u32 },
    CapacityExceeded { available: u32 },
    IncompleteDraft,
    AuthenticationRequired,
    BookingNotFound,
    StorageFailure,
}

impl DialogueError {
    // Human-readable message shown in the chat transcript.
    pub fn message(&self) -> String {
        match self {
            DialogueError::InvalidDate => {
                "I couldn't understand that date. Please use YYYY-MM-DD (e.g. 2026-12-25) or say 'today' or 'tomorrow'.".to_string()
            }
            DialogueError::DateInPast => {
                "That date is in the past. Please choose today or a later date.".to_string()
            }
            DialogueError::UnknownTimeSlot => {
                "That time slot doesn't exist. Please pick one of the available slots.".to_string()
            }
            DialogueError::SlotFull => {
                "Sorry, that time slot is fully booked. Please choose a different slot.".to_string()
            }
            DialogueError::InvalidVisitorCount { max } => {
                format!("Please select between 1 and {max} visitors.")
            }
            DialogueError::CapacityExceeded { available } => {
                format!("Sorry! Only {available} spot(s) are left in that time slot.")
            }
            DialogueError::IncompleteDraft => {
                "Booking information is incomplete. Let's start over and I'll guide you step by step!".to_string()
            }
            DialogueError::AuthenticationRequired => {
                "You need to be logged in to book tickets. Please log in first, then I can complete your booking!".to_string()
            }
            DialogueError::BookingNotFound => "I couldn't find that booking.".to_string(),
            DialogueError::StorageFailure => {
                "Something went wrong while saving your booking. Please try again.".to_string()
            }
        }
    }
}
