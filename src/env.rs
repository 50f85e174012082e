//! Environment variable names used by this crate for convenient
//! configuration of handlers from services.
//!
//! These are purely helpers; the handler and formatter types remain
//! decoupled from environment access.

/// Minimum level, e.g. `debug`, `INFO`, `warn+2`.
pub const CLOUD_LOG_LEVEL_ENV: &str = "CLOUD_LOG_LEVEL";

/// Whether formatted records carry a `source` object (`1`/`true`/`yes`).
pub const CLOUD_LOG_ADD_SOURCE_ENV: &str = "CLOUD_LOG_ADD_SOURCE";

/// Whether [`init`](crate::init) also prints events to the console.
pub const CLOUD_LOG_STDOUT_ENV: &str = "CLOUD_LOG_STDOUT";

/// Read a boolean flag; unset or unrecognized values yield `default`.
pub fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(raw) => parse_flag(&raw).unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
