//! Service-boundary response envelope
//!
//! Every remote call surfaces as an [`ApiResponse`]; callers branch on
//! `success` and never see a transport error directly.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discriminator carried by failed responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApiErrorCode {
    /// The transport failed before a response arrived.
    NetworkError,
    /// The response body was not JSON, or not the expected shape.
    ParseError,
    /// Non-2xx response without a server-supplied error code.
    RequestFailed,
    /// 401 that could not be recovered by a token refresh.
    TokenExpired,
    /// Error code supplied verbatim by the server.
    Server(String),
}

impl ApiErrorCode {
    /// Returns the wire representation of the code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NetworkError => "NETWORK_ERROR",
            Self::ParseError => "PARSE_ERROR",
            Self::RequestFailed => "REQUEST_FAILED",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::Server(code) => code,
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ApiErrorCode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "NETWORK_ERROR" => Self::NetworkError,
            "PARSE_ERROR" => Self::ParseError,
            "REQUEST_FAILED" => Self::RequestFailed,
            "TOKEN_EXPIRED" => Self::TokenExpired,
            _ => Self::Server(value),
        }
    }
}

impl From<ApiErrorCode> for String {
    fn from(value: ApiErrorCode) -> Self {
        value.as_str().to_string()
    }
}

/// Result of a remote call: `{ success, message, data?, error? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded.
    pub success: bool,
    /// Human readable message, from the server when it sent one.
    pub message: String,
    /// Decoded payload on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Failure discriminator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorCode>,
}

impl<T> ApiResponse<T> {
    /// Creates a successful response.
    #[must_use]
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }

    /// Creates a successful response without a payload.
    #[must_use]
    pub fn acknowledged(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            error: None,
        }
    }

    /// Creates a failed response.
    #[must_use]
    pub fn failure(message: impl Into<String>, error: ApiErrorCode) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error: Some(error),
        }
    }

    /// Returns true when the response failed with the given code.
    #[must_use]
    pub fn is_error(&self, code: &ApiErrorCode) -> bool {
        self.error.as_ref() == Some(code)
    }

    /// Maps the payload, keeping status and message.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            success: self.success,
            message: self.message,
            data: self.data.map(f),
            error: self.error,
        }
    }

    /// Converts into a `Result`, yielding the payload on success and the
    /// message plus error code otherwise.
    ///
    /// # Errors
    ///
    /// Returns `(message, code)` when the response is not a success or has
    /// no payload.
    pub fn into_result(self) -> Result<T, (String, Option<ApiErrorCode>)> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err((self.message, self.error)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_error_code_wire_names() {
        assert_eq!(ApiErrorCode::NetworkError.to_string(), "NETWORK_ERROR");
        assert_eq!(ApiErrorCode::TokenExpired.to_string(), "TOKEN_EXPIRED");
        assert_eq!(
            ApiErrorCode::from("OTP_EXPIRED".to_string()),
            ApiErrorCode::Server("OTP_EXPIRED".to_string())
        );
        assert_eq!(
            ApiErrorCode::from("PARSE_ERROR".to_string()),
            ApiErrorCode::ParseError
        );
    }

    #[test]
    fn test_failure_serializes_without_data() {
        let response: ApiResponse<()> =
            ApiResponse::failure("Network error", ApiErrorCode::NetworkError);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({"success": false, "message": "Network error", "error": "NETWORK_ERROR"})
        );
    }

    #[test]
    fn test_into_result() {
        let ok = ApiResponse::ok("Success", 5);
        assert_eq!(ok.into_result(), Ok(5));

        let failed: ApiResponse<i32> = ApiResponse::failure("nope", ApiErrorCode::RequestFailed);
        assert_eq!(
            failed.into_result(),
            Err(("nope".to_string(), Some(ApiErrorCode::RequestFailed)))
        );
    }
}
