//! Composition root: wires the stores, the transport and the services.

use std::sync::Arc;

use prohero_application::ports::{Clock, HttpTransport, KeyValueStore};
use prohero_application::{
    ApiClient, AuthService, ProviderService, SessionController, TokenManager, UserService,
};
use prohero_infrastructure::{AppConfig, FileKeyValueStore, ReqwestTransport, SystemClock};
use tracing::debug;

/// Every service of one CLI invocation, sharing a single token manager.
#[derive(Debug)]
pub struct AppContext {
    pub tokens: TokenManager,
    pub auth: AuthService,
    pub users: UserService,
    pub session: SessionController,
}

impl AppContext {
    /// Builds the production graph from the configuration.
    pub fn build(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let secure: Arc<dyn KeyValueStore> =
            Arc::new(FileKeyValueStore::new(config.secure_store_path()));
        let local: Arc<dyn KeyValueStore> =
            Arc::new(FileKeyValueStore::new(config.local_store_path()));
        let transport: Arc<dyn HttpTransport> =
            Arc::new(ReqwestTransport::new(config.request_timeout)?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

        debug!(
            base_url = %config.base_url(),
            data_dir = %config.data_dir.display(),
            "building services"
        );
        Ok(Self::wire(config, secure, local, transport, clock))
    }

    /// Wires the services over the given adapters.
    pub fn wire(
        config: &AppConfig,
        secure: Arc<dyn KeyValueStore>,
        local: Arc<dyn KeyValueStore>,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let base_url = config.base_url();
        let tokens = TokenManager::new(secure.clone(), transport.clone(), clock.clone(), &base_url);
        let api = ApiClient::new(tokens.clone(), transport, base_url);
        let users = UserService::new(api.clone());
        let session = SessionController::new(
            tokens.clone(),
            users.clone(),
            ProviderService::new(api.clone()),
            secure,
            local,
            clock,
        )
        .with_logout_policy(config.logout_policy);

        Self {
            tokens,
            auth: AuthService::new(api),
            users,
            session,
        }
    }
}
