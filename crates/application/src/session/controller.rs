//! Session controller
//!
//! Restores the session at startup, tracks the signed-in user and the duty
//! flag, and enforces the logout rule.

use std::str::FromStr;
use std::sync::Arc;

use prohero_domain::{
    AuthTokenResponse, DutyStatus, RefreshOutcome, SessionState, UpdateProfileRequest, User,
    session::keys,
};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::auth::TokenManager;
use crate::error::{ApplicationError, ApplicationResult};
use crate::ports::{Clock, KeyValueStore};
use crate::services::{ProviderService, UserService};

/// Whether a provider may log out while on duty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogoutPolicy {
    /// Logout is refused while on duty.
    #[default]
    RequireOffDuty,
    /// Logout is always allowed.
    Always,
}

impl LogoutPolicy {
    /// Configuration name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequireOffDuty => "require-off-duty",
            Self::Always => "always",
        }
    }
}

/// Error returned for an unknown logout policy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown logout policy: {0} (expected require-off-duty or always)")]
pub struct ParseLogoutPolicyError(String);

impl FromStr for LogoutPolicy {
    type Err = ParseLogoutPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "require-off-duty" | "require_off_duty" => Ok(Self::RequireOffDuty),
            "always" => Ok(Self::Always),
            other => Err(ParseLogoutPolicyError(other.to_string())),
        }
    }
}

/// Observable session state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Latent authentication state.
    pub state: SessionState,
    /// Signed-in user, when known.
    pub user: Option<User>,
    /// Whether the session holds real tokens.
    pub has_tokens: bool,
    /// Provider duty flag.
    pub duty: DutyStatus,
    /// Set while the session is being restored.
    pub is_loading: bool,
    /// Set while a duty change is in flight.
    pub is_duty_loading: bool,
}

/// Owner of the signed-in session.
pub struct SessionController {
    tokens: TokenManager,
    users: UserService,
    providers: ProviderService,
    secure: Arc<dyn KeyValueStore>,
    local: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    logout_policy: LogoutPolicy,
    snapshot: RwLock<SessionSnapshot>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("logout_policy", &self.logout_policy)
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Creates a signed-out controller.
    ///
    /// `secure` holds the cached user, `local` the duty flag.
    #[must_use]
    pub fn new(
        tokens: TokenManager,
        users: UserService,
        providers: ProviderService,
        secure: Arc<dyn KeyValueStore>,
        local: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tokens,
            users,
            providers,
            secure,
            local,
            clock,
            logout_policy: LogoutPolicy::default(),
            snapshot: RwLock::new(SessionSnapshot::default()),
        }
    }

    /// Replaces the logout policy.
    #[must_use]
    pub const fn with_logout_policy(mut self, policy: LogoutPolicy) -> Self {
        self.logout_policy = policy;
        self
    }

    /// A copy of the current state.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Latent authentication state.
    pub async fn state(&self) -> SessionState {
        self.snapshot.read().await.state
    }

    /// True when a user is known or tokens are held.
    pub async fn is_authenticated(&self) -> bool {
        let snapshot = self.snapshot.read().await;
        snapshot.user.is_some() || snapshot.has_tokens
    }

    /// Restores the session from storage.
    ///
    /// A stored token that the server still accepts makes the session
    /// active. Otherwise a refresh is attempted; when the refresh endpoint is
    /// missing and the token has not expired the session stays signed in as
    /// stale. Any other outcome signs out and clears the stored session.
    pub async fn load(&self) -> SessionState {
        self.snapshot.write().await.is_loading = true;
        let state = self.restore().await;

        let mut snapshot = self.snapshot.write().await;
        snapshot.state = state;
        snapshot.is_loading = false;
        info!(%state, "session loaded");
        state
    }

    /// Re-runs [`Self::load`].
    pub async fn refresh_auth_state(&self) -> SessionState {
        self.load().await
    }

    async fn restore(&self) -> SessionState {
        if self.tokens.load_tokens().await.is_none() {
            debug!("no stored tokens");
            self.mark_signed_out().await;
            return SessionState::SignedOut;
        }

        let (state, fetch_profile) = if self.tokens.validate_token().await {
            (SessionState::Active, false)
        } else {
            match self.tokens.refresh_access_token().await {
                RefreshOutcome::Refreshed => (SessionState::Active, true),
                RefreshOutcome::EndpointUnavailable if self.tokens.is_token_usable().await => {
                    warn!("refresh endpoint unavailable, keeping stale session");
                    (SessionState::Stale, false)
                }
                outcome => {
                    info!(?outcome, "stored session could not be restored");
                    self.tokens.clear_tokens().await;
                    if let Err(e) = self.secure.remove(keys::USER).await {
                        error!(error = %e, "failed to remove cached user");
                    }
                    self.mark_signed_out().await;
                    return SessionState::SignedOut;
                }
            }
        };

        self.snapshot.write().await.has_tokens = true;

        let cached = if fetch_profile {
            None
        } else {
            self.cached_user().await
        };
        match cached {
            Some(user) => self.snapshot.write().await.user = Some(user),
            None => {
                if let Err(e) = self.fetch_user_profile().await {
                    warn!(error = %e, "could not fetch user profile");
                }
            }
        }

        self.load_duty_status().await;
        state
    }

    async fn cached_user(&self) -> Option<User> {
        match self.secure.get_json::<User>(keys::USER).await {
            Ok(user) => user,
            Err(e) => {
                error!(error = %e, "cached user is unreadable");
                None
            }
        }
    }

    async fn mark_signed_out(&self) {
        let mut snapshot = self.snapshot.write().await;
        snapshot.user = None;
        snapshot.has_tokens = false;
    }

    /// Adopts a freshly verified login.
    ///
    /// Tokens must already be stored; the user embedded in the envelope is
    /// cached before the session is reloaded.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the user cannot be cached.
    pub async fn sign_in(&self, tokens: &AuthTokenResponse) -> ApplicationResult<SessionState> {
        if let Some(auth_user) = &tokens.user {
            let user = User::from_auth_user(auth_user, self.clock.now());
            self.store_user(user).await?;
        }
        Ok(self.load().await)
    }

    /// Fetches the profile and replaces the cached user.
    ///
    /// # Errors
    ///
    /// `NotSignedIn` without tokens, `Api` when the server refuses, `Storage`
    /// when the user cannot be cached.
    pub async fn fetch_user_profile(&self) -> ApplicationResult<User> {
        if !self.tokens.is_authenticated().await {
            return Err(ApplicationError::NotSignedIn);
        }
        let profile = self
            .users
            .get_profile()
            .await
            .into_result()
            .map_err(|(message, code)| ApplicationError::api(message, code))?;

        let user = User::from_profile(profile);
        self.store_user(user.clone()).await?;
        info!(user_id = %user.id, "user profile updated");
        Ok(user)
    }

    /// Sends a profile update and replaces the cached user.
    ///
    /// When the server acknowledges without returning the profile, the
    /// profile is fetched again.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch_user_profile`].
    pub async fn update_profile(&self, update: &UpdateProfileRequest) -> ApplicationResult<User> {
        if !self.tokens.is_authenticated().await {
            return Err(ApplicationError::NotSignedIn);
        }
        let response = self.users.update_profile(update).await;
        if !response.success {
            return Err(ApplicationError::api(response.message, response.error));
        }
        let Some(profile) = response.data else {
            debug!("profile update acknowledged without a profile, fetching it");
            return self.fetch_user_profile().await;
        };

        let user = User::from_profile(profile);
        self.store_user(user.clone()).await?;
        Ok(user)
    }

    async fn store_user(&self, user: User) -> ApplicationResult<()> {
        self.secure.set_json(keys::USER, &user).await?;
        self.snapshot.write().await.user = Some(user);
        Ok(())
    }

    /// Loads the duty flag: from the server when signed in, otherwise (or
    /// when the server fails) from the local cache.
    pub async fn load_duty_status(&self) -> DutyStatus {
        if self.snapshot.read().await.has_tokens {
            let response = self.providers.get_status().await;
            if response.success
                && let Some(status) = response.data
            {
                let duty = DutyStatus::from(status.on_duty);
                self.snapshot.write().await.duty = duty;
                self.cache_duty(duty).await;
                info!(duty = duty.label(), "duty status loaded from server");
                return duty;
            }
            warn!(message = %response.message, "failed to fetch duty status, using cached value");
        }

        match self.local.get_json::<bool>(keys::DUTY_STATUS).await {
            Ok(Some(on_duty)) => {
                let duty = DutyStatus::from(on_duty);
                self.snapshot.write().await.duty = duty;
                debug!(duty = duty.label(), "duty status loaded from cache");
            }
            Ok(None) => {}
            Err(e) => error!(error = %e, "cached duty status is unreadable"),
        }
        self.snapshot.read().await.duty
    }

    /// Re-runs [`Self::load_duty_status`].
    pub async fn refresh_duty_status(&self) -> DutyStatus {
        self.load_duty_status().await
    }

    /// Flips the duty flag on the server; the local state follows only when
    /// the server accepts the change.
    ///
    /// # Errors
    ///
    /// Returns `Api` with the server's message when the update fails.
    pub async fn toggle_duty_status(&self) -> ApplicationResult<DutyStatus> {
        let target = {
            let mut snapshot = self.snapshot.write().await;
            snapshot.is_duty_loading = true;
            snapshot.duty.toggled()
        };
        info!(duty = target.label(), "updating duty status");

        let response = self.providers.update_duty_status(target.is_on_duty()).await;
        let result = if response.success {
            self.snapshot.write().await.duty = target;
            self.cache_duty(target).await;
            info!(duty = target.label(), "duty status changed");
            Ok(target)
        } else {
            error!(message = %response.message, "failed to update duty status");
            Err(ApplicationError::api(response.message, response.error))
        };

        self.snapshot.write().await.is_duty_loading = false;
        result
    }

    async fn cache_duty(&self, duty: DutyStatus) {
        if let Err(e) = self
            .local
            .set_json(keys::DUTY_STATUS, &duty.is_on_duty())
            .await
        {
            error!(error = %e, "failed to cache duty status");
        }
    }

    /// Whether [`Self::logout`] would be allowed now.
    pub async fn can_logout(&self) -> bool {
        match self.logout_policy {
            LogoutPolicy::Always => true,
            LogoutPolicy::RequireOffDuty => !self.snapshot.read().await.duty.is_on_duty(),
        }
    }

    /// Ends the session and removes everything it stored.
    ///
    /// # Errors
    ///
    /// `OnDuty` when the policy forbids logging out while on duty; `Storage`
    /// when a key cannot be removed.
    pub async fn logout(&self) -> ApplicationResult<()> {
        if !self.can_logout().await {
            warn!("logout refused while on duty");
            return Err(ApplicationError::OnDuty);
        }

        self.tokens.clear_tokens().await;
        self.secure.remove(keys::USER).await?;
        self.secure.remove(keys::LEGACY_AUTH_TOKEN).await?;
        self.local.remove(keys::DUTY_STATUS).await?;

        *self.snapshot.write().await = SessionSnapshot::default();
        info!("logged out");
        Ok(())
    }
}
