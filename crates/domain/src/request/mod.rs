//! Request types

mod method;
mod spec;

pub use method::HttpMethod;
pub use spec::{HttpRequest, JSON_CONTENT_TYPE, NGROK_SKIP_HEADER};
