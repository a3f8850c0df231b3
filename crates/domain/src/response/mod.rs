//! Response types

mod api;
mod spec;

pub use api::{ApiErrorCode, ApiResponse};
pub use spec::{HttpResponse, StatusCode};
