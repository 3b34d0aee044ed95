use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use crate::expiry::DEFAULT_EXPIRY_SOON_DAYS;

pub const SETTING_EXPIRY_SOON_DAYS: &str = "expiry_soon_days";
pub const SETTING_API_ENABLED: &str = "api_enabled";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub expiry_soon_days: i64,
    pub api_enabled: bool,
    pub lookup_timeout: Duration,
    pub timezone: Tz,
    pub duplicate_window: chrono::Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_vars(|_| None)
    }
}

impl AppConfig {
    /// Reads `EXPIRY_*` variables, loading a `.env` file first when present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            db_path: get("EXPIRY_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("expiry_tracker.db")),
            expiry_soon_days: get("EXPIRY_SOON_DAYS")
                .and_then(|v| v.trim().parse().ok())
                .filter(|days: &i64| *days >= 0)
                .unwrap_or(DEFAULT_EXPIRY_SOON_DAYS),
            api_enabled: get("EXPIRY_API_ENABLED")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(false),
            lookup_timeout: Duration::from_secs(
                get("EXPIRY_LOOKUP_TIMEOUT_SECS")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(5),
            ),
            timezone: get("EXPIRY_TIMEZONE")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(Tz::UTC),
            duplicate_window: get("EXPIRY_DUPLICATE_WINDOW_SECS")
                .and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|secs| *secs >= 0)
                .and_then(chrono::Duration::try_seconds)
                .unwrap_or_else(default_duplicate_window),
        }
    }

    /// Applies values persisted in the settings table over the environment.
    pub fn with_settings(mut self, conn: &rusqlite::Connection) -> crate::error::Result<Self> {
        if let Some(days) = crate::db::get_setting(conn, SETTING_EXPIRY_SOON_DAYS)?
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|days| *days >= 0)
        {
            self.expiry_soon_days = days;
        }
        if let Some(enabled) =
            crate::db::get_setting(conn, SETTING_API_ENABLED)?.and_then(|v| parse_bool(&v))
        {
            self.api_enabled = enabled;
        }
        Ok(self)
    }
}

fn default_duplicate_window() -> chrono::Duration {
    chrono::Duration::seconds(2)
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
