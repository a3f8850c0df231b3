//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The HTTP method is not supported.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// The phone number cannot be normalized to a national number.
    #[error("invalid phone number: {0}")]
    InvalidPhone(String),

    /// The OTP is not a complete numeric code.
    #[error("invalid OTP: {0}")]
    InvalidOtp(String),

    /// A duty status value could not be parsed.
    #[error("invalid duty status: {0}")]
    InvalidDutyStatus(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
