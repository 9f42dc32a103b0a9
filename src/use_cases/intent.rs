// Free-text intent classification for clients that send messages instead of actions.

use crate::use_cases::dates::find_date_token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    StartBooking,
    CheckAvailability { date: String },
    Question,
}

const BOOKING_KEYWORDS: [&str; 3] = ["book", "reserve", "ticket"];
const AVAILABILITY_KEYWORDS: [&str; 3] = ["availability", "available", "check"];
// Questions about undoing a booking mention "booking" but must not start one.
const QUESTION_KEYWORDS: [&str; 2] = ["cancel", "refund"];

pub fn classify(text: &str) -> Intent {
    let lowered = text.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|keyword| lowered.contains(keyword));

    if mentions(&QUESTION_KEYWORDS) {
        return Intent::Question;
    }
    if mentions(&BOOKING_KEYWORDS) {
        return Intent::StartBooking;
    }
    if mentions(&AVAILABILITY_KEYWORDS) {
        if let Some(date) = find_date_token(&lowered) {
            return Intent::CheckAvailability { date };
        }
    }
    Intent::Question
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_text_asks_to_book_then_starts_booking() {
        assert_eq!(classify("I want to BOOK a visit"), Intent::StartBooking);
        assert_eq!(classify("can I reserve two spots"), Intent::StartBooking);
        assert_eq!(classify("need a ticket"), Intent::StartBooking);
    }

    #[test]
    fn when_text_asks_availability_with_date_then_checks_availability() {
        assert_eq!(
            classify("check availability for 2026-11-02"),
            Intent::CheckAvailability {
                date: "2026-11-02".to_string()
            }
        );
        assert_eq!(
            classify("what is available tomorrow"),
            Intent::CheckAvailability {
                date: "tomorrow".to_string()
            }
        );
    }

    #[test]
    fn when_availability_has_no_date_then_falls_back_to_question() {
        assert_eq!(classify("is anything available?"), Intent::Question);
    }

    #[test]
    fn when_text_asks_about_cancelling_then_is_a_question() {
        assert_eq!(classify("how do I cancel my booking"), Intent::Question);
        assert_eq!(classify("can I get a refund on my ticket"), Intent::Question);
    }

    #[test]
    fn when_price_question_mentions_a_ticket_then_starts_booking() {
        assert_eq!(classify("how much is a ticket"), Intent::StartBooking);
        assert_eq!(classify("what does it cost to book"), Intent::StartBooking);
        assert_eq!(classify("what are your prices"), Intent::Question);
    }

    #[test]
    fn when_text_is_unrelated_then_is_a_question() {
        assert_eq!(classify("hello there"), Intent::Question);
    }
}
