//! Token lifecycle management.
//!
//! Owns the token record: persists it to the secure store, answers validity
//! questions against the clock, and refreshes it. Refreshes are single-flight:
//! concurrent callers await one shared in-flight request and all observe its
//! outcome.

use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use prohero_domain::{
    AuthTokenResponse, HttpMethod, HttpRequest, RefreshOutcome, TokenInfo, TokenRecord, endpoints,
    session::keys, token_preview,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::ports::{Clock, HttpTransport, KeyValueStore, StorageError};

type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Whether a refresh may be skipped when the held token is already valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshMode {
    /// The server rejected the token; refresh regardless of its expiry.
    Always,
    /// The caller saw a stale token; skip when another refresh already
    /// replaced it.
    UnlessFresh,
}

/// `{ success, data }` body of the refresh endpoint.
#[derive(Debug, Deserialize)]
struct RefreshEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<AuthTokenResponse>,
}

/// Shared handle to the session's tokens.
///
/// Cloning is cheap; every clone sees the same tokens and the same
/// in-flight refresh.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

struct Inner {
    storage: Arc<dyn KeyValueStore>,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    base_url: String,
    token: RwLock<Option<TokenRecord>>,
    pending_refresh: Mutex<Option<PendingRefresh>>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Creates a token manager over the secure store.
    #[must_use]
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                storage,
                transport,
                clock,
                base_url: base_url.into(),
                token: RwLock::new(None),
                pending_refresh: Mutex::new(None),
            }),
        }
    }

    /// Stamps the expiry, keeps the record in memory and persists it.
    ///
    /// # Errors
    ///
    /// Returns the storage error of the first failed write; the in-memory
    /// copy is kept either way.
    pub async fn store_tokens(&self, record: TokenRecord) -> Result<(), StorageError> {
        self.inner.store(record).await
    }

    /// Loads the persisted record into memory.
    pub async fn load_tokens(&self) -> Option<TokenRecord> {
        self.inner.load().await
    }

    /// Drops the in-memory record, any pending refresh and the persisted keys.
    pub async fn clear_tokens(&self) {
        self.inner.clear().await;
    }

    /// The in-memory record, without touching storage.
    pub async fn current(&self) -> Option<TokenRecord> {
        self.inner.token.read().await.clone()
    }

    /// True while the token is more than 60 seconds from expiry.
    pub async fn is_token_valid(&self) -> bool {
        let now = self.inner.clock.now_millis();
        self.current()
            .await
            .is_some_and(|record| record.is_valid_at(now))
    }

    /// True while the token has not reached its raw expiry.
    pub async fn is_token_usable(&self) -> bool {
        let now = self.inner.clock.now_millis();
        self.current()
            .await
            .is_some_and(|record| record.is_usable_at(now))
    }

    /// Expiry details for display.
    pub async fn token_info(&self) -> TokenInfo {
        let now = self.inner.clock.now_millis();
        self.current()
            .await
            .map(|record| record.info_at(now))
            .unwrap_or_default()
    }

    /// Returns a usable access token, refreshing first when it is inside the
    /// refresh buffer.
    ///
    /// When the refresh does not succeed but the old token has not expired,
    /// the old token is returned rather than forcing a new login.
    pub async fn access_token(&self) -> Option<String> {
        let record = self.ensure_loaded().await?;
        if record.is_valid_at(self.inner.clock.now_millis()) {
            return Some(record.access_token);
        }

        if self.refresh(RefreshMode::UnlessFresh).await.is_refreshed() {
            return self.current().await.map(|record| record.access_token);
        }

        let record = self.current().await?;
        if record.is_usable_at(self.inner.clock.now_millis()) {
            warn!(
                token = %token_preview(&record.access_token),
                "refresh unavailable, using token close to expiry"
            );
            return Some(record.access_token);
        }
        None
    }

    /// `"<tokenType> <accessToken>"` for the Authorization header.
    pub async fn auth_header(&self) -> Option<String> {
        self.access_token().await?;
        let record = self.current().await?;
        if record.token_type.is_empty() {
            return None;
        }
        Some(record.authorization_header())
    }

    /// Exchanges the refresh token for new tokens.
    ///
    /// At most one refresh request is outstanding at a time: callers arriving
    /// while one is in flight await it instead of sending their own.
    pub async fn refresh_access_token(&self) -> RefreshOutcome {
        self.refresh(RefreshMode::Always).await
    }

    async fn refresh(&self, mode: RefreshMode) -> RefreshOutcome {
        let pending = {
            let mut slot = self.inner.pending_refresh.lock().await;
            if let Some(pending) = slot.as_ref() {
                debug!("joining in-flight token refresh");
                pending.clone()
            } else {
                let (can_refresh, fresh) = {
                    let token = self.inner.token.read().await;
                    let now = self.inner.clock.now_millis();
                    (
                        token.as_ref().is_some_and(TokenRecord::can_refresh),
                        token.as_ref().is_some_and(|record| record.is_valid_at(now)),
                    )
                };
                // A refresh that finished after the caller saw a stale token.
                if mode == RefreshMode::UnlessFresh && fresh {
                    debug!("token already refreshed");
                    return RefreshOutcome::Refreshed;
                }
                if !can_refresh {
                    info!("no refresh token available");
                    return RefreshOutcome::NoRefreshToken;
                }
                let inner = Arc::clone(&self.inner);
                let pending = async move { inner.perform_refresh().await }
                    .boxed()
                    .shared();
                *slot = Some(pending.clone());
                pending
            }
        };

        let outcome = pending.clone().await;

        let mut slot = self.inner.pending_refresh.lock().await;
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&pending)) {
            *slot = None;
        }
        outcome
    }

    /// Asks the server whether the current access token is still accepted.
    pub async fn validate_token(&self) -> bool {
        let Some(record) = self.current().await else {
            return false;
        };
        let request = HttpRequest::api(
            HttpMethod::Post,
            endpoints::join(&self.inner.base_url, endpoints::VALIDATE_TOKEN),
        )
        .with_json(&json!({ "token": record.access_token }));

        match self.inner.transport.send(request).await {
            Ok(response) => {
                debug!(status = response.status.as_u16(), "token validation answered");
                response.status.is_success()
            }
            Err(e) => {
                error!(error = %e, "token validation failed");
                false
            }
        }
    }

    /// True when a token is held that is usable now or after a refresh.
    pub async fn is_authenticated(&self) -> bool {
        if self.ensure_loaded().await.is_none() {
            return false;
        }
        if self.is_token_usable().await {
            return true;
        }
        self.access_token().await.is_some()
    }

    async fn ensure_loaded(&self) -> Option<TokenRecord> {
        match self.current().await {
            Some(record) => Some(record),
            None => self.inner.load().await,
        }
    }
}

impl Inner {
    async fn store(&self, record: TokenRecord) -> Result<(), StorageError> {
        let record = record.stamped(self.clock.now_millis());
        *self.token.write().await = Some(record.clone());

        let result = self.persist(&record).await;
        match &result {
            Ok(()) => info!(expires_in = record.expires_in, "tokens stored"),
            Err(e) => error!(error = %e, "failed to store tokens"),
        }
        result
    }

    async fn persist(&self, record: &TokenRecord) -> Result<(), StorageError> {
        self.storage.set_json(keys::TOKEN_DATA, record).await?;
        self.storage
            .set(keys::ACCESS_TOKEN, &record.access_token)
            .await?;
        self.storage
            .set(keys::REFRESH_TOKEN, &record.refresh_token)
            .await
    }

    async fn load(&self) -> Option<TokenRecord> {
        match self.storage.get_json::<TokenRecord>(keys::TOKEN_DATA).await {
            Ok(Some(record)) => {
                *self.token.write().await = Some(record.clone());
                debug!("tokens loaded from storage");
                Some(record)
            }
            Ok(None) => None,
            Err(e) => {
                error!(error = %e, "failed to load tokens");
                None
            }
        }
    }

    async fn clear(&self) {
        *self.token.write().await = None;
        *self.pending_refresh.lock().await = None;

        for key in [keys::TOKEN_DATA, keys::ACCESS_TOKEN, keys::REFRESH_TOKEN] {
            if let Err(e) = self.storage.remove(key).await {
                error!(key, error = %e, "failed to remove token key");
            }
        }
        info!("tokens cleared");
    }

    async fn perform_refresh(self: Arc<Self>) -> RefreshOutcome {
        let Some(refresh_token) = self
            .token
            .read()
            .await
            .as_ref()
            .map(|record| record.refresh_token.clone())
        else {
            return RefreshOutcome::NoRefreshToken;
        };

        info!("refreshing access token");
        let request = HttpRequest::api(
            HttpMethod::Post,
            endpoints::join(&self.base_url, endpoints::REFRESH_TOKEN),
        )
        .with_json(&json!({ "refreshToken": refresh_token }));

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "token refresh request failed");
                self.clear().await;
                return RefreshOutcome::Failed;
            }
        };

        if !response.status.is_success() {
            warn!(status = response.status.as_u16(), "token refresh failed");
            if response.status.is_not_found() {
                info!("refresh endpoint not available, keeping current tokens");
                return RefreshOutcome::EndpointUnavailable;
            }
            self.clear().await;
            return RefreshOutcome::Rejected;
        }

        let tokens = serde_json::from_str::<RefreshEnvelope>(&response.body)
            .ok()
            .filter(|envelope| envelope.success)
            .and_then(|envelope| envelope.data);

        let Some(tokens) = tokens else {
            warn!("invalid refresh response");
            self.clear().await;
            return RefreshOutcome::Rejected;
        };

        match self.store(tokens.token_record()).await {
            Ok(()) => {
                info!("access token refreshed");
                RefreshOutcome::Refreshed
            }
            Err(_) => {
                self.clear().await;
                RefreshOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::ports::TransportError;
    use crate::test_support::{Harness, T0, envelope};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[tokio::test]
    async fn test_store_tokens_persists_record_and_fields() {
        let h = Harness::new();
        h.tokens
            .store_tokens(TokenRecord::new("acc", "ref", "Bearer", 3600))
            .await
            .unwrap();

        let stored: TokenRecord =
            serde_json::from_str(&h.secure.value(keys::TOKEN_DATA).unwrap()).unwrap();
        assert_eq!(stored.expires_at, Some(T0 + 3_600_000));
        assert_eq!(h.secure.value(keys::ACCESS_TOKEN).as_deref(), Some("acc"));
        assert_eq!(h.secure.value(keys::REFRESH_TOKEN).as_deref(), Some("ref"));
        assert_eq!(h.tokens.current().await, Some(stored));
    }

    #[tokio::test]
    async fn test_store_tokens_propagates_storage_error() {
        let h = Harness::new();
        h.secure.fail_writes(true);
        let result = h
            .tokens
            .store_tokens(TokenRecord::new("acc", "ref", "Bearer", 3600))
            .await;
        assert!(matches!(result, Err(StorageError::Io(_))));
        assert!(h.tokens.current().await.is_some());
    }

    #[tokio::test]
    async fn test_load_tokens() {
        let h = Harness::new();
        assert_eq!(h.tokens.load_tokens().await, None);

        let record = h.persist_token("acc", "ref", 3600);
        assert_eq!(h.tokens.load_tokens().await, Some(record));
    }

    #[tokio::test]
    async fn test_load_tokens_ignores_corrupt_record() {
        let h = Harness::new();
        h.secure.insert(keys::TOKEN_DATA, "{not json");
        assert_eq!(h.tokens.load_tokens().await, None);
        assert!(!h.tokens.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_sixty_second_token_validity() {
        let h = Harness::new();
        h.tokens
            .store_tokens(TokenRecord::new("acc", "ref", "Bearer", 60))
            .await
            .unwrap();

        assert!(!h.tokens.is_token_valid().await);
        assert!(h.tokens.is_token_usable().await);

        h.clock.advance(59_999);
        assert!(h.tokens.is_token_usable().await);

        h.clock.advance(1);
        assert!(!h.tokens.is_token_usable().await);
    }

    #[tokio::test]
    async fn test_valid_token_needs_no_network() {
        let h = Harness::new();
        h.persist_token("acc", "ref", 3600);

        assert_eq!(h.tokens.access_token().await.as_deref(), Some("acc"));
        assert_eq!(
            h.tokens.auth_header().await.as_deref(),
            Some("Bearer acc")
        );
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let h = Harness::new();
        h.persist_token("old", "ref", 30);
        h.transport
            .respond(endpoints::REFRESH_TOKEN, 200, envelope("new", "ref2", 3600));
        h.transport.set_delay(Duration::from_millis(20));

        let (a, b, c, d, e) = tokio::join!(
            h.tokens.access_token(),
            h.tokens.access_token(),
            h.tokens.access_token(),
            h.tokens.access_token(),
            h.tokens.access_token(),
        );

        for token in [a, b, c, d, e] {
            assert_eq!(token.as_deref(), Some("new"));
        }
        assert_eq!(h.transport.calls(endpoints::REFRESH_TOKEN), 1);
        let body = h.transport.requests_to(endpoints::REFRESH_TOKEN)[0]
            .json_body()
            .unwrap();
        assert_eq!(body, json!({"refreshToken": "ref"}));
        assert_eq!(h.secure.value(keys::REFRESH_TOKEN).as_deref(), Some("ref2"));
    }

    #[tokio::test]
    async fn test_completed_refresh_is_not_reused() {
        let h = Harness::new();
        h.persist_token("old", "ref", 3600);
        h.tokens.load_tokens().await;
        h.transport
            .respond(endpoints::REFRESH_TOKEN, 200, envelope("new", "ref2", 3600));

        assert_eq!(h.tokens.refresh_access_token().await, RefreshOutcome::Refreshed);
        assert_eq!(h.tokens.refresh_access_token().await, RefreshOutcome::Refreshed);
        assert_eq!(h.transport.calls(endpoints::REFRESH_TOKEN), 2);
    }

    #[tokio::test]
    async fn test_late_caller_does_not_refresh_again() {
        let h = Harness::new();
        h.persist_token("old", "ref", 30);
        h.tokens.load_tokens().await;
        h.transport
            .respond(endpoints::REFRESH_TOKEN, 200, envelope("new", "ref2", 3600));

        assert_eq!(h.tokens.refresh_access_token().await, RefreshOutcome::Refreshed);
        // A caller that read the old record before the refresh landed.
        assert_eq!(
            h.tokens.refresh(RefreshMode::UnlessFresh).await,
            RefreshOutcome::Refreshed
        );
        assert_eq!(h.transport.calls(endpoints::REFRESH_TOKEN), 1);
        assert_eq!(h.tokens.access_token().await.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_auth_header_uses_token_type() {
        let h = Harness::new();
        h.persist_token("acc", "ref", 3600);
        assert_eq!(h.tokens.auth_header().await.as_deref(), Some("Bearer acc"));
    }

    #[tokio::test]
    async fn test_refresh_404_keeps_tokens() {
        let h = Harness::new();
        h.persist_token("old", "ref", 120);
        h.clock.advance(70_000);
        h.transport
            .respond(endpoints::REFRESH_TOKEN, 404, json!({"message": "Not Found"}));

        assert_eq!(h.tokens.access_token().await.as_deref(), Some("old"));
        assert!(h.tokens.is_authenticated().await);
        assert!(h.secure.contains(keys::TOKEN_DATA));
        assert!(h.secure.contains(keys::ACCESS_TOKEN));
        assert!(h.secure.contains(keys::REFRESH_TOKEN));
    }

    #[tokio::test]
    async fn test_refresh_404_after_expiry_yields_no_token() {
        let h = Harness::new();
        h.persist_token("old", "ref", 120);
        h.clock.advance(121_000);
        h.transport
            .respond(endpoints::REFRESH_TOKEN, 404, json!({}));

        assert_eq!(h.tokens.access_token().await, None);
        assert!(h.secure.contains(keys::TOKEN_DATA));
    }

    #[tokio::test]
    async fn test_rejected_refresh_clears_tokens() {
        let h = Harness::new();
        h.persist_token("old", "ref", 30);
        h.tokens.load_tokens().await;
        h.transport
            .respond(endpoints::REFRESH_TOKEN, 401, json!({"message": "invalid"}));

        assert_eq!(h.tokens.refresh_access_token().await, RefreshOutcome::Rejected);
        assert!(!h.secure.contains(keys::TOKEN_DATA));
        assert!(!h.secure.contains(keys::ACCESS_TOKEN));
        assert!(!h.secure.contains(keys::REFRESH_TOKEN));
        assert!(!h.tokens.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_unsuccessful_refresh_body_clears_tokens() {
        let h = Harness::new();
        h.persist_token("old", "ref", 30);
        h.tokens.load_tokens().await;
        h.transport
            .respond(endpoints::REFRESH_TOKEN, 200, json!({"success": false}));

        assert_eq!(h.tokens.refresh_access_token().await, RefreshOutcome::Rejected);
        assert_eq!(h.tokens.current().await, None);
    }

    #[tokio::test]
    async fn test_refresh_transport_error_clears_tokens() {
        let h = Harness::new();
        h.persist_token("old", "ref", 30);
        h.tokens.load_tokens().await;
        h.transport.fail(
            endpoints::REFRESH_TOKEN,
            TransportError::ConnectionFailed("refused".to_string()),
        );

        assert_eq!(h.tokens.refresh_access_token().await, RefreshOutcome::Failed);
        assert!(!h.secure.contains(keys::TOKEN_DATA));
    }

    #[tokio::test]
    async fn test_refresh_without_tokens_sends_nothing() {
        let h = Harness::new();
        assert_eq!(
            h.tokens.refresh_access_token().await,
            RefreshOutcome::NoRefreshToken
        );
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_validate_token() {
        let h = Harness::new();
        assert!(!h.tokens.validate_token().await);

        h.persist_token("acc", "ref", 3600);
        h.tokens.load_tokens().await;
        h.transport
            .respond(endpoints::VALIDATE_TOKEN, 200, json!({"valid": true}));
        assert!(h.tokens.validate_token().await);

        let sent = h.transport.requests_to(endpoints::VALIDATE_TOKEN);
        assert_eq!(sent[0].json_body().unwrap(), json!({"token": "acc"}));
    }

    #[tokio::test]
    async fn test_token_info() {
        let h = Harness::new();
        assert_eq!(h.tokens.token_info().await, TokenInfo::default());

        h.persist_token("acc", "ref", 3600);
        h.tokens.load_tokens().await;
        let info = h.tokens.token_info().await;
        assert!(info.is_valid);
        assert_eq!(info.expires_in_secs, Some(3600));
    }
}
