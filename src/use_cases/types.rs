use crate::domain::entities::TimeSlot;

/// Booking rules shared by the dialogue and availability use cases.
#[derive(Debug, Clone)]
pub struct BookingSettings {
    /// Daily slot catalog in display order.
    pub slots: Vec<TimeSlot>,
    /// Price per visitor in minor currency units.
    pub ticket_price_cents: u64,
    pub currency: String,
    /// Upper bound on visitors in a single booking.
    pub max_visitors_per_booking: u32,
    /// When set, confirm_and_pay needs an authenticated caller.
    pub require_login: bool,
    pub login_url: String,
}

impl BookingSettings {
    pub fn slot(&self, id: &str) -> Option<&TimeSlot> {
        self.slots.iter().find(|slot| slot.id == id)
    }

    pub fn price_for(&self, visitors: u32) -> u64 {
        self.ticket_price_cents * u64::from(visitors)
    }

    pub fn format_amount(&self, cents: u64) -> String {
        format!("{}.{:02} {}", cents / 100, cents % 100, self.currency)
    }
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            slots: default_slots(),
            ticket_price_cents: 10_000,
            currency: "USD".to_string(),
            max_visitors_per_booking: 10,
            require_login: true,
            login_url: "/login".to_string(),
        }
    }
}

pub fn default_slots() -> Vec<TimeSlot> {
    [
        ("09:00", "09:00–10:00", 20),
        ("10:00", "10:00–11:00", 25),
        ("11:00", "11:00–12:00", 25),
        ("13:00", "13:00–14:00", 30),
        ("14:00", "14:00–15:00", 30),
        ("15:00", "15:00–16:00", 20),
    ]
    .into_iter()
    .map(|(id, label, capacity)| TimeSlot {
        id: id.to_string(),
        label: label.to_string(),
        capacity,
    })
    .collect()
}
