use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Device class of a tracked page view. Derived client-side from the
/// user-agent string; membership is the only hard constraint the server
/// enforces on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceType {
    pub const ALL: [DeviceType; 3] = [DeviceType::Mobile, DeviceType::Tablet, DeviceType::Desktop];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "mobile" => Some(Self::Mobile),
            "tablet" => Some(Self::Tablet),
            "desktop" => Some(Self::Desktop),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The payload the client sends to POST /api/analytics/track.
///
/// Everything is optional at the wire level so the service layer can produce
/// field-specific validation errors instead of serde rejections; `deviceType`
/// stays a string here for the same reason.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPayload {
    pub page: Option<String>,
    pub session_id: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub language: Option<String>,
    pub screen_resolution: Option<String>,
    pub timezone: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub ip: Option<String>,
    pub is_new_session: Option<bool>,
}

/// A validated, sanitised event ready for insertion. The store assigns the
/// id and the write timestamp and hands back the full [`VisitorEvent`].
#[derive(Debug, Clone)]
pub struct NewVisitorEvent {
    pub page: String,
    pub session_id: String,
    pub is_new_session: bool,
    pub device_type: DeviceType,
    pub browser: String,
    pub os: String,
    pub user_agent: String,
    pub referrer: String,
    pub language: String,
    pub screen_resolution: String,
    pub timezone: String,
    pub country: Option<String>,
    pub city: Option<String>,
    pub ip: Option<String>,
}

impl NewVisitorEvent {
    /// Attach the store-assigned identity and write time.
    pub fn into_record(self, id: String, timestamp: DateTime<Utc>) -> VisitorEvent {
        VisitorEvent {
            id,
            timestamp,
            page: self.page,
            session_id: self.session_id,
            is_new_session: self.is_new_session,
            device_type: self.device_type,
            browser: self.browser,
            os: self.os,
            user_agent: self.user_agent,
            referrer: self.referrer,
            language: self.language,
            screen_resolution: self.screen_resolution,
            timezone: self.timezone,
            country: self.country,
            city: self.city,
            ip: self.ip,
        }
    }
}

/// One stored page view. Immutable once written; the only lifecycle after
/// creation is deletion. `timestamp` is always store-assigned and is the
/// sole ordering and range key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub page: String,
    pub session_id: String,
    pub is_new_session: bool,
    pub device_type: DeviceType,
    pub browser: String,
    pub os: String,
    pub user_agent: String,
    pub referrer: String,
    pub language: String,
    pub screen_resolution: String,
    pub timezone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}
