//! Records exchanged with the dashboard backend.
//!
//! Acquisitions are read-only observations produced by the backend. Users and
//! tokens only travel through the API client and the session context.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Anything that can be placed on a timeline by its epoch-seconds timestamp.
pub trait Timestamped {
    /// Seconds since the Unix epoch.
    fn timestamp(&self) -> i64;
}

/// A single acquisition event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Acquisition {
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    /// Number of ore sites found by this acquisition
    pub ore_sites: u64,
}

impl Acquisition {
    pub fn new(timestamp: i64, ore_sites: u64) -> Self {
        Self {
            timestamp,
            ore_sites,
        }
    }

    /// The acquisition time as a UTC datetime, if the timestamp is representable.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.timestamp, 0).single()
    }
}

impl Timestamped for Acquisition {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// A dashboard user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub name: String,
    /// Only sent when creating or changing credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Partial update for a user account. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl UserUpdate {
    /// True when the update would not change anything.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.password.is_none()
    }
}

/// Credentials posted to the token endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub user_id: String,
    pub password: String,
}

/// Response of the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Bearer access token
    pub access: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquisition_wire_format() {
        let acq: Acquisition =
            serde_json::from_str(r#"{"timestamp": 1700000000, "ore_sites": 12}"#).unwrap();
        assert_eq!(acq, Acquisition::new(1_700_000_000, 12));
        assert_eq!(acq.observed_at().unwrap().to_rfc3339(), "2023-11-14T22:13:20+00:00");
    }

    #[test]
    fn test_user_password_omitted_when_absent() {
        let user = User {
            user_id: "jdoe".to_string(),
            name: "Jane Doe".to_string(),
            password: None,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password"));

        let parsed: User = serde_json::from_str(r#"{"user_id":"jdoe","name":"Jane Doe"}"#).unwrap();
        assert_eq!(parsed, user);
    }

    #[test]
    fn test_user_update_serializes_only_set_fields() {
        let update = UserUpdate {
            name: Some("New Name".to_string()),
            password: None,
        };
        assert_eq!(serde_json::to_string(&update).unwrap(), r#"{"name":"New Name"}"#);
        assert!(!update.is_empty());
        assert!(UserUpdate::default().is_empty());
    }
}
