//! ProHero Domain - Core business types
//!
//! This crate defines the domain model for the provider session client:
//! tokens, users, duty status, the response envelope and the pure helpers
//! (phone normalization, name validation, OTP entry).
//! All types here are pure Rust with no I/O dependencies.

pub mod auth;
pub mod endpoints;
pub mod error;
pub mod name;
pub mod otp;
pub mod phone;
pub mod provider;
pub mod request;
pub mod response;
pub mod session;
pub mod user;

pub use auth::{
    AuthTokenResponse, AuthUser, REFRESH_BUFFER_MS, RefreshOutcome, TokenInfo, TokenRecord,
    token_preview,
};
pub use error::{DomainError, DomainResult};
pub use name::{NameError, split_full_name, validate_full_name};
pub use otp::{OTP_LENGTH, OTP_RESEND_TIMEOUT_SECS, OtpEntry, ResendCountdown};
pub use phone::{format_phone_for_api, is_valid_phone_number};
pub use provider::{DutyStatus, ProviderStatus, UpdateDutyStatusRequest};
pub use request::{HttpMethod, HttpRequest};
pub use response::{ApiErrorCode, ApiResponse, HttpResponse, StatusCode};
pub use session::SessionState;
pub use user::{UpdateProfileRequest, User, UserProfile};
