//! Authentication domain types

mod types;

pub use types::{
    AuthTokenResponse, AuthUser, REFRESH_BUFFER_MS, RefreshOutcome, TokenInfo, TokenRecord,
    token_preview,
};
