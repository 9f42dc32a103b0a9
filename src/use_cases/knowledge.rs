// Canned answers for general questions about the museum.

use regex::Regex;
use std::sync::LazyLock;

use crate::use_cases::types::BookingSettings;

pub const EXHIBITS: [&str; 14] = [
    "Dinosaur Sculpture",
    "Phoenix Bird",
    "Wooden Bicycle",
    "Dodo Bird",
    "Black & White TV",
    "Lion Skull",
    "Nefertiti Bust",
    "Exakta Camera",
    "Arrau Turtle",
    "Amenemhat III",
    "Egyptian Coffins",
    "Daoist Immortal",
    "Roza Loewenfeld Bust",
    "Durga Goddess (10th Century)",
];

#[derive(Debug, Clone, Copy)]
enum Topic {
    Greeting,
    Booking,
    Hours,
    Availability,
    Exhibits,
    Pricing,
    Cancellation,
    Policies,
    Services,
    Navigation,
    Registration,
    Login,
    Help,
    Farewell,
    Contact,
}

// Checked in order; the first matching pattern wins.
static TOPICS: LazyLock<Vec<(Regex, Topic)>> = LazyLock::new(|| {
    [
        (r"\b(hello|hi|hey|greetings)\b", Topic::Greeting),
        (r"cancel.*(booking|ticket)|how.*cancel", Topic::Cancellation),
        (r"book.*ticket|how.*book|reserve|buy.*ticket|need.*ticket", Topic::Booking),
        (r"time.*slot|available.*time|when.*open|hours|timing", Topic::Hours),
        (r"availability|available", Topic::Availability),
        (r"exhibit|collection|artifact|what.*see", Topic::Exhibits),
        (r"price|pricing|cost|fee|how.*much", Topic::Pricing),
        (r"polic|guideline|rules|terms|refund", Topic::Policies),
        (r"service|what.*offer|features", Topic::Services),
        (r"navigate|where.*go|how.*find|directions|where.*is", Topic::Navigation),
        (r"register|sign.*up|create.*account", Topic::Registration),
        (r"login|sign.*in|log.*in", Topic::Login),
        (r"help|support|assist|guide", Topic::Help),
        (r"\b(bye|goodbye|thanks|thank you)\b", Topic::Farewell),
        (r"contact|email|phone|address|get.*touch", Topic::Contact),
    ]
    .into_iter()
    .map(|(pattern, topic)| (Regex::new(pattern).expect("topic pattern is valid"), topic))
    .collect()
});

pub const EMPTY_MESSAGE_REPLY: &str =
    "Please ask me a question! I can help with booking tickets, exhibits, and more.";

/// Answer a general question from the built-in knowledge base.
pub fn answer(message: &str, settings: &BookingSettings) -> String {
    let message = message.trim().to_lowercase();
    if message.is_empty() {
        return EMPTY_MESSAGE_REPLY.to_string();
    }

    if let Some(exhibit) = EXHIBITS
        .iter()
        .find(|exhibit| message.contains(&exhibit.to_lowercase()))
    {
        return format!(
            "Great! We have the '{exhibit}' in our collection.\n\nYou can view it in 3D on the 'Explore Exhibits' page: rotate it, zoom in for details and view it from any angle.\n\nWould you like to know about other exhibits or book a visit?"
        );
    }

    if let Some(slot) = settings
        .slots
        .iter()
        .find(|slot| message.contains(&slot.label.to_lowercase()))
    {
        return format!(
            "The {} slot holds up to {} visitors per day. Say 'book a ticket' and I'll walk you through reserving it, or ask me to check availability for a date.",
            slot.label, slot.capacity
        );
    }

    let topic = TOPICS
        .iter()
        .find(|(pattern, _)| pattern.is_match(&message))
        .map(|(_, topic)| *topic);

    match topic {
        Some(topic) => render(topic, settings),
        None => "I'm not sure I understood that.\n\nI can help you with:\n• Booking tickets: ask 'How do I book a ticket?'\n• Exhibits: ask 'What exhibits do you have?'\n• Time slots: ask 'What time slots are there?'\n• Policies: ask 'What are your policies?'\n\nTry one of these, or rephrase your question!".to_string(),
    }
}

fn render(topic: Topic, settings: &BookingSettings) -> String {
    match topic {
        Topic::Greeting => "Hello! I'm your museum assistant. I can help you with:\n• Booking tickets\n• Information about exhibits\n• Time slots and availability\n• Museum policies\n\nWhat would you like to know?".to_string(),
        Topic::Booking => "I can help you book a ticket!\n\n1. Pick the date you'd like to visit\n2. Choose a time slot\n3. Tell me how many visitors\n4. Confirm and choose how to pay\n\nSay 'book a ticket' to start, or 'check availability for tomorrow' to see open slots.\n\nNote: you need to be logged in to complete a booking.".to_string(),
        Topic::Hours => {
            let lines: Vec<String> = settings
                .slots
                .iter()
                .map(|slot| format!("• {} (capacity: {} visitors)", slot.label, slot.capacity))
                .collect();
            format!(
                "We offer {} time slots daily:\n{}\n\nThe museum is open every day.",
                settings.slots.len(),
                lines.join("\n")
            )
        }
        Topic::Availability => "I can check availability for you!\n\nJust tell me the date:\n• 'Check availability for tomorrow'\n• 'What's available on 2026-12-20'\n\nI'll show every time slot with its remaining spots, and you can book straight from the list.".to_string(),
        Topic::Exhibits => format!(
            "We have {} exhibits you can explore in 3D, including:\n• {}\n\nVisit the 'Explore Exhibits' page to view them.",
            EXHIBITS.len(),
            EXHIBITS.join("\n• ")
        ),
        Topic::Pricing => format!(
            "Ticket pricing:\n• Standard ticket: {} per person\n• Visitors must be 18 or older\n• Group bookings: same rate, up to {} visitors per booking\n\nYou can pay online or in cash at the entrance. Every ticket includes access to all exhibits.",
            settings.format_amount(settings.ticket_price_cents),
            settings.max_visitors_per_booking
        ),
        Topic::Cancellation => "To cancel a booking:\n1. Log in to your account\n2. Go to 'My Bookings'\n3. Find your booking and click 'Cancel'\n\nCancellations must be made within 48 hours of booking.".to_string(),
        Topic::Policies => "Museum policies:\n1. Visitors must be 18 years or older\n2. Tickets can be cancelled within 48 hours of booking\n3. One booking per person per time slot\n4. No refunds for missed visits\n5. Please arrive on time for your slot\n6. Each slot has limited capacity, so book early!".to_string(),
        Topic::Services => "We offer:\n• Online ticket booking with real-time availability\n• An interactive 3D exhibit viewer\n• English and French interfaces\n• This assistant, available 24/7".to_string(),
        Topic::Navigation => "Navigation guide:\n• Book tickets: 'Book Your Visit' on the homepage, or /calendar\n• View exhibits: 'Explore Exhibits', or /view\n• Your bookings: /my_bookings".to_string(),
        Topic::Registration => "To create an account, click 'Register', choose a username and password, and submit the form. After that you can book tickets and manage your bookings.".to_string(),
        Topic::Login => format!(
            "To log in, open {} and enter your username and password. Once logged in you can book tickets and view your booking history.",
            settings.login_url
        ),
        Topic::Help => "I'm here to help! I can assist with booking tickets, exhibit information, time slot availability, museum policies and navigation. Just ask!".to_string(),
        Topic::Farewell => "You're welcome! Come back any time you need help. Enjoy your visit!".to_string(),
        Topic::Contact => "For additional support, use this assistant any time or visit the contact page at /contact.".to_string(),
    }
}
