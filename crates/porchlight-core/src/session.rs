//! Client session identity.
//!
//! A session groups page views separated by less than thirty minutes of
//! inactivity. The context is an explicit value the embedding tracker owns
//! and threads through each call; expiry is computed from the caller's
//! `now`, so session rollover is fully deterministic under test.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// A session expires after this much inactivity.
pub const SESSION_TIMEOUT_MINUTES: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: String,
    pub last_activity: DateTime<Utc>,
}

impl SessionContext {
    /// Begin a fresh session at `now`.
    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            session_id: new_session_id(now),
            last_activity: now,
        }
    }

    /// Record activity at `now`.
    ///
    /// Returns the context to carry forward and whether this activity opened
    /// a new session. An expired context rolls a fresh id; a live one keeps
    /// its id with `last_activity` advanced.
    pub fn touch(self, now: DateTime<Utc>) -> (Self, bool) {
        if now - self.last_activity >= Duration::minutes(SESSION_TIMEOUT_MINUTES) {
            (Self::start(now), true)
        } else {
            (
                Self {
                    session_id: self.session_id,
                    last_activity: now,
                },
                false,
            )
        }
    }
}

/// Opaque session id: `session_{unix_millis}_{9 random base36 chars}`.
fn new_session_id(now: DateTime<Utc>) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("session_{}_{}", now.timestamp_millis(), suffix)
}
