//! Domain services over the authenticated API.

mod provider_service;
mod user_service;

pub use provider_service::ProviderService;
pub use user_service::UserService;
