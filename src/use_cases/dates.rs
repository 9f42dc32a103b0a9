// Date parsing for typed and button-supplied dialogue input.

use chrono::{Duration, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

use crate::domain::errors::DialogueError;

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y"];

static DATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4}[-/]\d{1,2}[-/]\d{1,2}|\d{1,2}[-/]\d{1,2}[-/]\d{4}|today|tomorrow)\b")
        .expect("date token pattern is valid")
});

/// Parse a relative keyword or one of the accepted date formats.
///
/// `MM/DD/YYYY` is tried before `DD/MM/YYYY`, so an ambiguous value such as
/// `03/04/2027` resolves to March 4th.
pub fn parse_date(value: &str, today: NaiveDate) -> Result<NaiveDate, DialogueError> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "" => Err(DialogueError::InvalidDate),
        "today" => Ok(today),
        "tomorrow" => Ok(today + Duration::days(1)),
        other => DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(other, format).ok())
            .ok_or(DialogueError::InvalidDate),
    }
}

// Parse and reject dates before `today`.
pub fn parse_bookable_date(value: &str, today: NaiveDate) -> Result<NaiveDate, DialogueError> {
    let date = parse_date(value, today)?;
    if date < today {
        return Err(DialogueError::DateInPast);
    }
    Ok(date)
}

// First date-like token in free text, lowercased.
pub fn find_date_token(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    DATE_TOKEN
        .captures(&lowered)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str().to_string())
}

pub fn display_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

pub fn short_date(date: NaiveDate) -> String {
    date.format("%b %d").to_string()
}
