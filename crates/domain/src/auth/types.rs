//! Token and authentication envelope types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Milliseconds before expiry at which a token stops counting as valid.
pub const REFRESH_BUFFER_MS: i64 = 60_000;

/// Token record owned by the token manager.
///
/// Serialized with camelCase keys; this is the `tokenData` blob kept in
/// secure storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    /// Bearer credential.
    pub access_token: String,
    /// Credential exchanged for a new access token.
    pub refresh_token: String,
    /// Authorization scheme, usually "Bearer".
    pub token_type: String,
    /// Lifetime granted by the server, in seconds.
    pub expires_in: u64,
    /// Absolute expiry in epoch milliseconds, stamped when stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl TokenRecord {
    /// Creates an unstamped record.
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        token_type: impl Into<String>,
        expires_in: u64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            token_type: token_type.into(),
            expires_in,
            expires_at: None,
        }
    }

    /// Returns a copy with `expires_at = stored_at_ms + expires_in * 1000`.
    #[must_use]
    pub fn stamped(mut self, stored_at_ms: i64) -> Self {
        let lifetime_ms = i64::try_from(self.expires_in)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        self.expires_at = Some(stored_at_ms.saturating_add(lifetime_ms));
        self
    }

    /// True while `now` is more than the refresh buffer before expiry.
    #[must_use]
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| now_ms < expires_at - REFRESH_BUFFER_MS)
    }

    /// True while `now` is before the raw expiry.
    #[must_use]
    pub fn is_usable_at(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| now_ms < expires_at)
    }

    /// Whether a refresh can be attempted.
    #[must_use]
    pub fn can_refresh(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// Returns the Authorization header value.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    /// Expiry details relative to `now`.
    #[must_use]
    pub fn info_at(&self, now_ms: i64) -> TokenInfo {
        let Some(expires_at) = self.expires_at else {
            return TokenInfo::default();
        };
        TokenInfo {
            is_valid: self.is_valid_at(now_ms),
            expires_at: DateTime::<Utc>::from_timestamp_millis(expires_at),
            expires_in_secs: Some(((expires_at - now_ms) / 1000).max(0)),
        }
    }
}

/// Expiry summary for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenInfo {
    /// Whether the token is outside the refresh buffer.
    pub is_valid: bool,
    /// Absolute expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Whole seconds remaining, never negative.
    pub expires_in_secs: Option<i64>,
}

/// Outcome of a refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New tokens were stored.
    Refreshed,
    /// The refresh endpoint answered 404; existing tokens were kept.
    EndpointUnavailable,
    /// The server rejected the refresh; tokens were cleared.
    Rejected,
    /// No refresh token was held; nothing was sent.
    NoRefreshToken,
    /// The request or the storage write failed; tokens were cleared.
    Failed,
}

impl RefreshOutcome {
    /// True only for [`RefreshOutcome::Refreshed`].
    #[must_use]
    pub const fn is_refreshed(self) -> bool {
        matches!(self, Self::Refreshed)
    }
}

/// User summary returned with a login or registration token envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    /// Server identifier; numeric on the wire, kept as a string.
    #[serde(deserialize_with = "string_or_number")]
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
    /// Account status label.
    #[serde(default)]
    pub account_status: Option<String>,
    /// Whether the phone number was verified.
    #[serde(default)]
    pub is_phone_verified: Option<bool>,
    /// Account type label.
    #[serde(default)]
    pub user_type: Option<String>,
}

/// Token envelope returned by OTP verification and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokenResponse {
    /// Bearer credential.
    pub access_token: String,
    /// Refresh credential.
    pub refresh_token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
    /// Authorization scheme.
    pub token_type: String,
    /// Set by the server when the account was just created.
    #[serde(default)]
    pub is_new_user: Option<bool>,
    /// Signed-in user.
    #[serde(default)]
    pub user: Option<AuthUser>,
}

impl AuthTokenResponse {
    /// Extracts the token record (unstamped).
    #[must_use]
    pub fn token_record(&self) -> TokenRecord {
        TokenRecord::new(
            self.access_token.clone(),
            self.refresh_token.clone(),
            self.token_type.clone(),
            self.expires_in,
        )
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

/// Shortens a token for log output (first 8 chars + "...").
#[must_use]
pub fn token_preview(token: &str) -> String {
    if token.len() > 12 {
        format!("{}...", token.chars().take(8).collect::<String>())
    } else {
        token.to_string()
    }
}
