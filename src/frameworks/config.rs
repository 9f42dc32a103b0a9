//! Startup configuration.
//!
//! Values come from an optional TOML file (`BOOKING_CONFIG`, default
//! `booking.toml`) and are then overridden by environment variables.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::{env, fmt, fs, io, time::Duration};

use crate::domain::entities::{Identity, TimeSlot};
use crate::use_cases::types::{BookingSettings, default_slots};

pub const DEFAULT_CONFIG_PATH: &str = "booking.toml";
// How often idle session drafts are swept.
pub const DRAFT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: Option<String>,
    /// Session drafts untouched for this long are dropped.
    pub draft_ttl: Duration,
    pub booking: BookingSettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub service_url: Option<String>,
    pub verify_timeout: Duration,
    pub static_tokens: HashMap<String, Identity>,
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: String, source: io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => write!(f, "failed to read {path}: {source}"),
            ConfigError::Parse(err) => write!(f, "invalid config file: {err}"),
            ConfigError::Invalid(message) => write!(f, "invalid configuration: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    server: ServerSection,
    booking: BookingSection,
    auth: AuthSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ServerSection {
    host: IpAddr,
    port: u16,
    database_url: Option<String>,
    draft_ttl_seconds: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            database_url: None,
            draft_ttl_seconds: 60 * 60,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BookingSection {
    ticket_price_cents: Option<u64>,
    currency: Option<String>,
    max_visitors_per_booking: Option<u32>,
    require_login: Option<bool>,
    login_url: Option<String>,
    slots: Option<Vec<SlotEntry>>,
}

#[derive(Debug, Deserialize)]
struct SlotEntry {
    id: String,
    label: Option<String>,
    capacity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct AuthSection {
    service_url: Option<String>,
    verify_timeout_ms: u64,
    static_tokens: HashMap<String, StaticToken>,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            service_url: None,
            verify_timeout_ms: 1500,
            static_tokens: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StaticToken {
    user_id: i64,
    display_name: String,
}

// Load the config file (when present) and apply environment overrides.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let path = env_var("BOOKING_CONFIG").unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let mut settings = if Path::new(&path).exists() {
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        from_toml_str(&contents)?
    } else {
        from_toml_str("")?
    };

    apply_env_overrides(&mut settings);
    Ok(settings)
}

pub fn from_toml_str(contents: &str) -> Result<Settings, ConfigError> {
    let file: FileConfig = toml::from_str(contents).map_err(ConfigError::Parse)?;
    let defaults = BookingSettings::default();

    let slots = match file.booking.slots {
        Some(entries) => entries
            .into_iter()
            .map(|entry| TimeSlot {
                label: entry.label.unwrap_or_else(|| entry.id.clone()),
                id: entry.id,
                capacity: entry.capacity,
            })
            .collect(),
        None => default_slots(),
    };

    let static_tokens = file
        .auth
        .static_tokens
        .into_iter()
        .map(|(token, entry)| {
            (
                token,
                Identity {
                    user_id: entry.user_id,
                    display_name: entry.display_name,
                },
            )
        })
        .collect();

    let settings = Settings {
        host: file.server.host,
        port: file.server.port,
        database_url: file.server.database_url,
        draft_ttl: Duration::from_secs(file.server.draft_ttl_seconds),
        booking: BookingSettings {
            slots,
            ticket_price_cents: file
                .booking
                .ticket_price_cents
                .unwrap_or(defaults.ticket_price_cents),
            currency: file.booking.currency.unwrap_or(defaults.currency),
            max_visitors_per_booking: file
                .booking
                .max_visitors_per_booking
                .unwrap_or(defaults.max_visitors_per_booking),
            require_login: file.booking.require_login.unwrap_or(defaults.require_login),
            login_url: file.booking.login_url.unwrap_or(defaults.login_url),
        },
        auth: AuthSettings {
            service_url: file.auth.service_url,
            verify_timeout: Duration::from_millis(file.auth.verify_timeout_ms),
            static_tokens,
        },
    };

    validate(&settings)?;
    Ok(settings)
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Some(port) = env_var("BOOKING_SERVER_PORT").and_then(|value| value.parse().ok()) {
        settings.port = port;
    }
    if let Some(url) = env_var("DATABASE_URL") {
        settings.database_url = Some(url);
    }
    if let Some(url) = env_var("AUTH_SERVICE_URL") {
        settings.auth.service_url = Some(url);
    }
    if let Some(millis) = env_var("AUTH_VERIFY_TIMEOUT_MS").and_then(|value| value.parse().ok()) {
        settings.auth.verify_timeout = Duration::from_millis(millis);
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    let booking = &settings.booking;
    if booking.slots.is_empty() {
        return Err(ConfigError::Invalid("at least one time slot is required".to_string()));
    }

    let mut seen = HashSet::new();
    for slot in &booking.slots {
        if slot.id.trim().is_empty() {
            return Err(ConfigError::Invalid("time slot id must not be empty".to_string()));
        }
        if !seen.insert(slot.id.as_str()) {
            return Err(ConfigError::Invalid(format!("duplicate time slot {}", slot.id)));
        }
        if slot.capacity == 0 {
            return Err(ConfigError::Invalid(format!(
                "time slot {} must have a positive capacity",
                slot.id
            )));
        }
    }

    if booking.max_visitors_per_booking == 0 {
        return Err(ConfigError::Invalid(
            "max_visitors_per_booking must be positive".to_string(),
        ));
    }
    if booking.currency.trim().is_empty() {
        return Err(ConfigError::Invalid("currency must not be empty".to_string()));
    }
    Ok(())
}
