//! Authenticated and public REST requests.

mod client;

pub use client::{
    ApiClient, AUTH_EXPIRED_MESSAGE, INVALID_RESPONSE_MESSAGE, MAX_AUTH_RETRIES,
    NETWORK_ERROR_MESSAGE, RequestAuth,
};
