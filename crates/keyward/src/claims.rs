//! Token payload

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::IssueError;

/// Claims carried by an identity token
///
/// Timestamps have second precision on the wire (`iat`, `exp` as integer seconds).
/// Field names on the wire follow the login flow's historical payload: `user_id`,
/// `username`, `email`, `iat`, `exp`, `iss`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identifier of the user the token asserts identity for
    #[serde(rename = "user_id")]
    pub subject_id: i64,

    /// Username of the subject
    #[serde(rename = "username")]
    pub subject_name: String,

    /// Email address of the subject
    pub email: String,

    /// Issued-at
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    /// Expiry
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,

    /// Tag of the signing path that produced the token
    #[serde(rename = "iss")]
    pub issuer: String,
}

impl Claims {
    /// Build claims for a subject, issued at `now` (truncated to whole seconds)
    ///
    /// # Errors
    ///
    /// Returns [`IssueError::InvalidLifetime`] when `lifetime` is not positive or the
    /// expiry cannot be represented.
    pub fn new_for(
        subject_id: i64,
        subject_name: &str,
        email: &str,
        issuer: &str,
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> Result<Self, IssueError> {
        if lifetime <= Duration::zero() {
            return Err(IssueError::InvalidLifetime {
                reason: format!("lifetime must be positive, got {}s", lifetime.num_seconds()),
            });
        }

        let issued_at = now.trunc_subsecs(0);
        let expires_at =
            issued_at
                .checked_add_signed(lifetime)
                .ok_or_else(|| IssueError::InvalidLifetime {
                    reason: "expiry overflows the representable time range".to_string(),
                })?;

        Ok(Self {
            subject_id,
            subject_name: subject_name.to_string(),
            email: email.to_string(),
            issued_at,
            expires_at,
            issuer: issuer.to_string(),
        })
    }

    /// Whether the token is past its lifetime at `now`
    ///
    /// A token is still valid at exactly `expires_at`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether `expires_at` is strictly after `issued_at`
    #[must_use]
    pub fn has_valid_lifetime(&self) -> bool {
        self.expires_at > self.issued_at
    }

    /// JSON object in canonical field order, as written into the claims segment
    pub(crate) fn to_json_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("user_id".into(), Value::from(self.subject_id));
        map.insert("username".into(), Value::from(self.subject_name.as_str()));
        map.insert("email".into(), Value::from(self.email.as_str()));
        map.insert("iat".into(), Value::from(self.issued_at.timestamp()));
        map.insert("exp".into(), Value::from(self.expires_at.timestamp()));
        map.insert("iss".into(), Value::from(self.issuer.as_str()));
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_new_for_sets_window() {
        let now = at(1_700_000_000) + Duration::milliseconds(750);
        let claims = Claims::new_for(
            7,
            "alice",
            "alice@example.com",
            "keyward-kv",
            now,
            Duration::hours(24),
        )
        .unwrap();

        assert_eq!(claims.issued_at, at(1_700_000_000));
        assert_eq!(claims.expires_at, at(1_700_000_000 + 86_400));
        assert!(claims.has_valid_lifetime());
    }

    #[test]
    fn test_rejects_non_positive_lifetime() {
        let result = Claims::new_for(1, "a", "a@x", "iss", at(0), Duration::zero());
        assert!(matches!(result, Err(IssueError::InvalidLifetime { .. })));
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let claims =
            Claims::new_for(1, "a", "a@x", "iss", at(1_000), Duration::seconds(60)).unwrap();
        assert!(!claims.is_expired_at(at(1_060)));
        assert!(claims.is_expired_at(at(1_061)));
    }

    #[test]
    fn test_json_value_matches_serde_schema() {
        let claims =
            Claims::new_for(42, "bob", "bob@example.com", "iss", at(5), Duration::seconds(10))
                .unwrap();
        let back: Claims = serde_json::from_value(claims.to_json_value()).unwrap();
        assert_eq!(back, claims);
    }

    #[test]
    fn test_missing_field_rejected() {
        let json = r#"{"user_id":1,"username":"a","iat":1,"exp":2,"iss":"x"}"#;
        assert!(serde_json::from_str::<Claims>(json).is_err());
    }

    #[test]
    fn test_wrong_type_rejected() {
        let json = r#"{"user_id":"1","username":"a","email":"e","iat":1,"exp":2,"iss":"x"}"#;
        assert!(serde_json::from_str::<Claims>(json).is_err());
    }
}
