//! ProHero Application - Session services and ports
//!
//! This crate defines the application layer with:
//! - Port traits (clock, key-value storage, HTTP transport)
//! - Token lifecycle management with single-flight refresh
//! - The REST client and the services built on it
//! - The session controller and the sign-in flow
//! - Application-level error handling

pub mod api;
pub mod auth;
pub mod error;
pub mod login;
pub mod ports;
pub mod services;
pub mod session;

#[cfg(test)]
mod test_support;

pub use api::{ApiClient, MAX_AUTH_RETRIES, RequestAuth};
pub use auth::{AuthService, RegistrationVerification, TokenManager};
pub use error::{ApplicationError, ApplicationResult};
pub use login::{LoginError, LoginFlow, LoginStep};
pub use ports::{Clock, HttpTransport, KeyValueStore, StorageError, TransportError};
pub use services::{ProviderService, UserService};
pub use session::{LogoutPolicy, SessionController, SessionSnapshot};
