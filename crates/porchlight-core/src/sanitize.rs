//! Input sanitisation and per-field length caps.
//!
//! Every free-text field of a tracked event passes through [`sanitize`] and
//! [`truncate`] before storage. Values over their cap are shortened, never
//! rejected; only the required fields and the device-type enum are hard
//! validation failures (see the service layer).

pub const PAGE_MAX_LEN: usize = 500;
pub const SESSION_ID_MAX_LEN: usize = 100;
pub const USER_AGENT_MAX_LEN: usize = 1000;
pub const REFERRER_MAX_LEN: usize = 500;
pub const LANGUAGE_MAX_LEN: usize = 10;
pub const SCREEN_RESOLUTION_MAX_LEN: usize = 20;
pub const TIMEZONE_MAX_LEN: usize = 50;
pub const COUNTRY_MAX_LEN: usize = 100;
pub const CITY_MAX_LEN: usize = 100;
pub const BROWSER_MAX_LEN: usize = 50;
pub const OS_MAX_LEN: usize = 50;

/// Trim surrounding whitespace and strip angle brackets.
pub fn sanitize(raw: &str) -> String {
    raw.trim().chars().filter(|c| *c != '<' && *c != '>').collect()
}

/// Cap `raw` at `max` characters, appending a `...` marker when shortened.
pub fn truncate(raw: &str, max: usize) -> String {
    if raw.chars().count() > max {
        let mut out: String = raw.chars().take(max).collect();
        out.push_str("...");
        out
    } else {
        raw.to_string()
    }
}

/// Sanitise then truncate in one step.
pub fn clean(raw: &str, max: usize) -> String {
    truncate(&sanitize(raw), max)
}
