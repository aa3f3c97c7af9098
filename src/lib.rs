pub mod address;
pub mod api;
pub mod auth;
pub mod config;
pub mod debounce;
pub mod format;
pub mod http;
pub mod notice;
pub mod reporter;
pub mod session;
pub mod state;
pub mod storage;
pub mod sys;
pub mod token;
pub mod types;

/// Monitoring backend base URL used when neither config nor env provide one.
pub const DEFAULT_API_BASE: &str = "https://api.vigilcrypto.io";

/// Envelope code the backend returns when a bearer credential is no longer valid.
pub const DEFAULT_SESSION_EXPIRED_CODE: i64 = 501;

/// Window in which repeated session-expired failures produce a single notice.
pub const DEFAULT_NOTICE_DEBOUNCE_MS: u64 = 2_000;

/// Env var overriding `api.base_url`.
pub const API_BASE_ENV: &str = "MONITOR_API_BASE";

/// Telegram deep-link base URL.
pub const TELEGRAM_LINK_BASE: &str = "https://t.me";
