//! Authentication for the provider session.
//!
//! This module provides:
//! - Token persistence, validity checks and single-flight refresh
//! - OTP login and registration calls

mod service;
mod token_manager;

pub use service::{AuthService, RegistrationVerification};
pub use token_manager::TokenManager;
