pub mod availability;
pub mod bookings;
pub mod dates;
pub mod dialogue;
pub mod intent;
pub mod knowledge;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;
