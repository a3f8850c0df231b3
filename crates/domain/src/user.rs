//! User profile types
//!
//! [`UserProfile`] is the API shape; [`User`] is what the session keeps and
//! caches under the `user` storage key.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;

/// Profile as returned by `GET /api/user/profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Server identifier.
    pub id: String,
    /// National phone number.
    pub phone: String,
    /// Given name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Creation timestamp as sent by the server.
    pub created_at: String,
    /// Last update timestamp.
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Partial profile update for `PUT /api/user/profile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    /// New given name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// New family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// New email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UpdateProfileRequest {
    /// True when no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.email.is_none()
    }
}

/// Signed-in user held by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Server identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Given name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// National phone number.
    pub phone_number: String,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Whether the phone number was verified.
    pub is_verified: bool,
}

impl User {
    /// Builds the session user from a fetched profile.
    #[must_use]
    pub fn from_profile(profile: UserProfile) -> Self {
        Self {
            name: display_name(profile.first_name.as_deref(), profile.last_name.as_deref()),
            id: profile.id,
            first_name: profile.first_name,
            last_name: profile.last_name,
            phone_number: profile.phone,
            email: profile.email,
            avatar: profile.avatar,
            created_at: profile.created_at,
            is_verified: true,
        }
    }

    /// Builds the session user from the user embedded in a token envelope.
    #[must_use]
    pub fn from_auth_user(user: &AuthUser, created_at: DateTime<Utc>) -> Self {
        Self {
            id: user.id.clone(),
            name: display_name(user.first_name.as_deref(), user.last_name.as_deref()),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone_number: user.phone.clone(),
            email: user.email.clone(),
            avatar: None,
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            is_verified: user.is_phone_verified.unwrap_or(true),
        }
    }
}

/// `"first last"` trimmed, or `"User"` when both parts are blank.
#[must_use]
pub fn display_name(first_name: Option<&str>, last_name: Option<&str>) -> String {
    let joined = format!("{} {}", first_name.unwrap_or(""), last_name.unwrap_or(""));
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        "User".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Some("Asha"), Some("Rao")), "Asha Rao");
        assert_eq!(display_name(Some("Asha"), None), "Asha");
        assert_eq!(display_name(None, Some("Rao")), "Rao");
        assert_eq!(display_name(Some(" "), None), "User");
        assert_eq!(display_name(None, None), "User");
    }

    #[test]
    fn test_user_from_profile() {
        let profile: UserProfile = serde_json::from_value(json!({
            "id": "u-1",
            "phone": "9876543210",
            "firstName": "Ravi",
            "createdAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        let user = User::from_profile(profile);
        assert_eq!(user.name, "Ravi");
        assert_eq!(user.phone_number, "9876543210");
        assert!(user.is_verified);
    }

    #[test]
    fn test_user_from_auth_user_timestamps() {
        let auth_user: AuthUser = serde_json::from_value(json!({
            "id": 7,
            "phone": "9876543210",
            "isPhoneVerified": false
        }))
        .unwrap();
        let created = DateTime::<Utc>::from_timestamp_millis(0).unwrap();
        let user = User::from_auth_user(&auth_user, created);
        assert_eq!(user.id, "7");
        assert_eq!(user.name, "User");
        assert_eq!(user.created_at, "1970-01-01T00:00:00.000Z");
        assert!(!user.is_verified);
    }

    #[test]
    fn test_update_request_skips_unset_fields() {
        let request = UpdateProfileRequest {
            email: Some("a@b.co".to_string()),
            ..UpdateProfileRequest::default()
        };
        assert_eq!(serde_json::to_value(&request).unwrap(), json!({"email": "a@b.co"}));
        assert!(UpdateProfileRequest::default().is_empty());
    }
}
