//! Session state and persisted key names

/// Secure-store and local-store keys.
pub mod keys {
    /// Serialized [`crate::user::User`].
    pub const USER: &str = "user";
    /// Current access token, duplicated from the token record.
    pub const ACCESS_TOKEN: &str = "accessToken";
    /// Current refresh token, duplicated from the token record.
    pub const REFRESH_TOKEN: &str = "refreshToken";
    /// Full token record including the computed expiry.
    pub const TOKEN_DATA: &str = "tokenData";
    /// Token key written by earlier app versions; removed on logout.
    pub const LEGACY_AUTH_TOKEN: &str = "authToken";
    /// Cached duty flag (local store).
    pub const DUTY_STATUS: &str = "dutyStatus";
}

/// Latent authentication state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No tokens held.
    #[default]
    SignedOut,
    /// Signed in with a token outside the refresh buffer.
    Active,
    /// Signed in with a token inside the refresh buffer or past expiry
    /// whose refresh could not complete.
    Stale,
}

impl SessionState {
    /// True for both signed-in states.
    #[must_use]
    pub const fn is_signed_in(self) -> bool {
        matches!(self, Self::Active | Self::Stale)
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SignedOut => "signed out",
            Self::Active => "signed in",
            Self::Stale => "signed in (token stale)",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
