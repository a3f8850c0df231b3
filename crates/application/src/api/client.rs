//! The single request helper used by every service.
//!
//! Requests go out through the [`HttpTransport`] port and come back as an
//! [`ApiResponse`]; transport and decoding failures are folded into the
//! envelope rather than returned as errors.

use std::sync::Arc;

use prohero_domain::{
    ApiErrorCode, ApiResponse, HttpMethod, HttpRequest, HttpResponse, endpoints,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::auth::TokenManager;
use crate::ports::HttpTransport;

/// How many times a bearer request is retried after a 401 and a successful
/// refresh.
pub const MAX_AUTH_RETRIES: u32 = 1;

/// Message returned when a 401 could not be recovered.
pub const AUTH_EXPIRED_MESSAGE: &str = "Authentication expired. Please login again.";

/// Message returned when the response body is not JSON of the expected shape.
pub const INVALID_RESPONSE_MESSAGE: &str = "Invalid response format";

/// Message returned when no response was received.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error";

/// Message returned when a request body could not be encoded as JSON.
pub const INVALID_REQUEST_MESSAGE: &str = "Invalid request body";

/// Whether a request carries the session's bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestAuth {
    /// Attach `Authorization` and recover from a 401 by refreshing once.
    #[default]
    Bearer,
    /// No credentials.
    Public,
}

/// REST client bound to one API base URL.
#[derive(Clone)]
pub struct ApiClient {
    tokens: TokenManager,
    transport: Arc<dyn HttpTransport>,
    base_url: String,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a client.
    #[must_use]
    pub fn new(
        tokens: TokenManager,
        transport: Arc<dyn HttpTransport>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            tokens,
            transport,
            base_url: base_url.into(),
        }
    }

    /// The token manager this client attaches credentials from.
    #[must_use]
    pub const fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Sends a request and classifies the response.
    ///
    /// `headers` are applied after the standard ones and may override them.
    /// A bearer request answered with 401 triggers one refresh; when it
    /// succeeds the request is retried once, otherwise the tokens are cleared
    /// and `TOKEN_EXPIRED` is returned.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: HttpMethod,
        body: Option<Value>,
        headers: &[(&str, &str)],
        auth: RequestAuth,
    ) -> ApiResponse<T> {
        let url = endpoints::join(&self.base_url, endpoint);
        let mut retries = 0;

        loop {
            let request = self
                .build_request(method, &url, body.as_ref(), headers, auth)
                .await;
            debug!(%method, %url, "sending request");

            let response = match self.transport.send(request).await {
                Ok(response) => response,
                Err(e) => {
                    error!(%method, %url, error = %e, "network error");
                    return ApiResponse::failure(
                        NETWORK_ERROR_MESSAGE,
                        ApiErrorCode::NetworkError,
                    );
                }
            };
            debug!(%method, %url, status = response.status.as_u16(), "response received");

            if auth == RequestAuth::Bearer && response.status.is_unauthorized() {
                if retries < MAX_AUTH_RETRIES {
                    retries += 1;
                    info!(%url, "unauthorized, attempting token refresh");
                    let outcome = self.tokens.refresh_access_token().await;
                    if outcome.is_refreshed() {
                        info!(%url, "retrying request with refreshed token");
                        continue;
                    }
                    warn!(?outcome, "token refresh did not succeed");
                } else {
                    warn!(%url, "still unauthorized after refresh");
                }
                self.tokens.clear_tokens().await;
                return ApiResponse::failure(AUTH_EXPIRED_MESSAGE, ApiErrorCode::TokenExpired);
            }

            return classify(&response);
        }
    }

    /// `GET` without a body.
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str, auth: RequestAuth) -> ApiResponse<T> {
        self.request(endpoint, HttpMethod::Get, None, &[], auth)
            .await
    }

    /// `POST` with an optional JSON body.
    pub async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<Value>,
        auth: RequestAuth,
    ) -> ApiResponse<T> {
        self.request(endpoint, HttpMethod::Post, body, &[], auth)
            .await
    }

    /// `PUT` with an optional JSON body.
    pub async fn put<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<Value>,
        auth: RequestAuth,
    ) -> ApiResponse<T> {
        self.request(endpoint, HttpMethod::Put, body, &[], auth)
            .await
    }

    /// `PATCH` with an optional JSON body.
    pub async fn patch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<Value>,
        auth: RequestAuth,
    ) -> ApiResponse<T> {
        self.request(endpoint, HttpMethod::Patch, body, &[], auth)
            .await
    }

    /// Sends `body` encoded as JSON.
    ///
    /// A body that cannot be encoded is never sent; the call fails with
    /// `PARSE_ERROR` instead.
    pub async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        method: HttpMethod,
        body: &B,
        auth: RequestAuth,
    ) -> ApiResponse<T> {
        match serde_json::to_value(body) {
            Ok(body) => self.request(endpoint, method, Some(body), &[], auth).await,
            Err(e) => {
                error!(endpoint, error = %e, "request body could not be encoded");
                ApiResponse::failure(INVALID_REQUEST_MESSAGE, ApiErrorCode::ParseError)
            }
        }
    }

    /// `DELETE` without a body.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        auth: RequestAuth,
    ) -> ApiResponse<T> {
        self.request(endpoint, HttpMethod::Delete, None, &[], auth)
            .await
    }

    async fn build_request(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&Value>,
        headers: &[(&str, &str)],
        auth: RequestAuth,
    ) -> HttpRequest {
        let mut request = HttpRequest::api(method, url);

        if auth == RequestAuth::Bearer {
            match self.tokens.auth_header().await {
                Some(header) => request = request.with_header("Authorization", header),
                None => debug!(%url, "no access token available, sending without credentials"),
            }
        }

        for (name, value) in headers {
            request = request.with_header(*name, *value);
        }

        if let Some(body) = body {
            request = request.with_json(body);
        }
        request
    }
}

/// Folds a received response into the envelope.
fn classify<T: DeserializeOwned>(response: &HttpResponse) -> ApiResponse<T> {
    let status = response.status;

    let body = if response.body.trim().is_empty() {
        Value::Null
    } else {
        match serde_json::from_str::<Value>(&response.body) {
            Ok(body) => body,
            Err(e) => {
                error!(status = status.as_u16(), error = %e, "response body is not JSON");
                return ApiResponse::failure(INVALID_RESPONSE_MESSAGE, ApiErrorCode::ParseError);
            }
        }
    };

    let message = body
        .get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .map(str::to_string);

    if !status.is_success() {
        let code = body
            .get("error")
            .and_then(Value::as_str)
            .filter(|code| !code.is_empty())
            .map_or(ApiErrorCode::RequestFailed, |code| {
                ApiErrorCode::from(code.to_string())
            });
        let message = message.unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        warn!(status = status.as_u16(), error = %code, %message, "request failed");
        return ApiResponse::failure(message, code);
    }

    let payload = match body.get("data") {
        Some(data) if !data.is_null() => data.clone(),
        _ => body,
    };

    let message = message.unwrap_or_else(|| "Success".to_string());
    match serde_json::from_value::<T>(payload) {
        Ok(data) => ApiResponse::ok(message, data),
        Err(e) => {
            warn!(error = %e, "response payload has an unexpected shape, dropping it");
            ApiResponse::acknowledged(message)
        }
    }
}
