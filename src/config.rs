use crate::error::{AppError, Result};

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// HTTP timeout for a single listing feed request (seconds).
pub const FETCH_TIMEOUT_SECS: u64 = 30;

/// HTTP timeout for a single Telegram sendMessage call (seconds).
pub const NOTIFY_TIMEOUT_SECS: u64 = 15;

/// Watches processed concurrently during a run. 1 = strictly sequential.
pub const WATCH_CONCURRENCY: usize = 1;

/// Price classification constants.
pub mod pricing {
    /// Number of cells in the in-band position bar.
    pub const BAR_WIDTH: usize = 10;
    /// Static bar used whenever the price sits outside the band.
    pub const OUT_OF_BAND_BAR: &str = "...";
    /// Symbolic placeholder price sellers use for "make an offer" listings.
    pub const PLACEHOLDER_PRICE: u64 = 1;
    /// Negotiability marker ("Verhandlungsbasis"). Matched case-sensitively.
    pub const NEGOTIABLE_MARKER: &str = "VB";
    /// Negotiable listings up to this factor above `price_high` are surfaced.
    pub const NEGOTIABLE_TOLERANCE: f64 = 1.1;
    /// Listings down to this factor of `price_low` are surfaced as bargains.
    pub const BARGAIN_FLOOR: f64 = 0.7;
    pub const CURRENCY: &str = "€";
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    /// Telegram bot token (TELEGRAM_BOT_TOKEN). Alerts go to the log when unset.
    pub telegram_bot_token: Option<String>,
    /// Target chat (TELEGRAM_CHAT_ID).
    pub telegram_chat_id: Option<String>,
    pub telegram_api_url: String,
    pub fetch_timeout_secs: u64,
    /// Bounded worker pool width for per-watch processing (WATCH_CONCURRENCY)
    pub watch_concurrency: usize,
    pub user_agent: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "listing-alert.db".to_string()),
            telegram_bot_token: non_empty_var("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: non_empty_var("TELEGRAM_CHAT_ID"),
            telegram_api_url: std::env::var("TELEGRAM_API_URL")
                .unwrap_or_else(|_| TELEGRAM_API_URL.to_string()),
            fetch_timeout_secs: std::env::var("FETCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| FETCH_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .map_err(|_| {
                    AppError::Config("FETCH_TIMEOUT_SECS must be a whole number of seconds".to_string())
                })?,
            watch_concurrency: std::env::var("WATCH_CONCURRENCY")
                .unwrap_or_else(|_| WATCH_CONCURRENCY.to_string())
                .parse::<usize>()
                .map_err(|_| AppError::Config("WATCH_CONCURRENCY must be a positive integer".to_string()))?
                .max(1),
            user_agent: std::env::var("USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
        })
    }

    /// Both token and chat id are required for Telegram delivery.
    pub fn telegram_credentials(&self) -> Option<(&str, &str)> {
        match (&self.telegram_bot_token, &self.telegram_chat_id) {
            (Some(token), Some(chat)) => Some((token.as_str(), chat.as_str())),
            _ => None,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
