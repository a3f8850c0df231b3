//! Application error types

use prohero_domain::{ApiErrorCode, DomainError};
use thiserror::Error;

use crate::ports::StorageError;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// A domain validation error occurred.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// A storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The server answered with a failed response.
    #[error("{message}")]
    Api {
        /// Message from the response.
        message: String,
        /// Error discriminator, if any.
        code: Option<ApiErrorCode>,
    },

    /// Logout refused because the provider is still on duty.
    #[error("Cannot logout while on duty. Please go off duty first.")]
    OnDuty,

    /// The operation needs a signed-in session.
    #[error("not signed in")]
    NotSignedIn,
}

impl ApplicationError {
    /// Builds an `Api` error from a failed response's parts.
    #[must_use]
    pub fn api(message: impl Into<String>, code: Option<ApiErrorCode>) -> Self {
        Self::Api {
            message: message.into(),
            code,
        }
    }
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
