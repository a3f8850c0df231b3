//! OTP login and registration calls.

use prohero_domain::{ApiResponse, AuthTokenResponse, HttpMethod, endpoints, phone};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use crate::api::{ApiClient, RequestAuth};
use crate::auth::TokenManager;
use crate::error::ApplicationResult;

/// Payload of the registration verification call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationVerification {
    /// Phone number in any accepted format.
    pub phone: String,
    /// The 6-digit code.
    pub otp: String,
    /// First name.
    pub first_name: String,
    /// Last name; may be empty.
    pub last_name: String,
    /// Optional email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Unauthenticated auth endpoints.
///
/// Successful verifications store the returned tokens.
#[derive(Debug, Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    /// Creates a service over the shared API client.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn tokens(&self) -> &TokenManager {
        self.api.tokens()
    }

    /// Sends a login OTP.
    pub async fn send_login_otp(&self, phone: &str) -> ApiResponse<Value> {
        let phone = Self::format_phone_for_api(phone);
        info!(%phone, "sending login OTP");
        self.api
            .post(
                endpoints::LOGIN_SEND_OTP,
                Some(json!({ "phone": phone })),
                RequestAuth::Public,
            )
            .await
    }

    /// Sends a registration OTP.
    pub async fn send_register_otp(&self, phone: &str) -> ApiResponse<Value> {
        let phone = Self::format_phone_for_api(phone);
        info!(%phone, "sending register OTP");
        self.api
            .post(
                endpoints::REGISTER_SEND_OTP,
                Some(json!({ "phone": phone })),
                RequestAuth::Public,
            )
            .await
    }

    /// Verifies a login OTP and stores the issued tokens.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the tokens could not be persisted; a
    /// rejected code is reported in the response, not as an error.
    pub async fn verify_login_otp(
        &self,
        phone: &str,
        otp: &str,
    ) -> ApplicationResult<ApiResponse<AuthTokenResponse>> {
        let phone = Self::format_phone_for_api(phone);
        info!(%phone, "verifying login OTP");
        let response = self
            .api
            .post(
                endpoints::LOGIN_VERIFY_OTP,
                Some(json!({ "phone": phone, "otp": otp })),
                RequestAuth::Public,
            )
            .await;
        self.store_issued_tokens(&response, "login").await?;
        Ok(response)
    }

    /// Verifies a registration OTP and stores the issued tokens.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the tokens could not be persisted.
    pub async fn verify_register_otp(
        &self,
        registration: RegistrationVerification,
    ) -> ApplicationResult<ApiResponse<AuthTokenResponse>> {
        let registration = RegistrationVerification {
            phone: Self::format_phone_for_api(&registration.phone),
            ..registration
        };
        info!(phone = %registration.phone, "verifying register OTP");

        let response = self
            .api
            .send_json(
                endpoints::REGISTER_VERIFY_OTP,
                HttpMethod::Post,
                &registration,
                RequestAuth::Public,
            )
            .await;
        self.store_issued_tokens(&response, "registration").await?;
        Ok(response)
    }

    /// Whether the number belongs to an account, checked by sending a login
    /// OTP.
    pub async fn check_user_exists(&self, phone: &str) -> bool {
        self.send_login_otp(phone).await.success
    }

    /// Normalizes a phone number to the 10 national digits.
    #[must_use]
    pub fn format_phone_for_api(phone: &str) -> String {
        phone::format_phone_for_api(phone)
    }

    /// Whether the input is a 10-digit number, optionally prefixed by 91.
    #[must_use]
    pub fn is_valid_phone_number(phone: &str) -> bool {
        phone::is_valid_phone_number(phone)
    }

    async fn store_issued_tokens(
        &self,
        response: &ApiResponse<AuthTokenResponse>,
        flow: &str,
    ) -> ApplicationResult<()> {
        if !response.success {
            return Ok(());
        }
        if let Some(tokens) = &response.data {
            self.tokens().store_tokens(tokens.token_record()).await?;
            info!(flow, "tokens stored");
        }
        Ok(())
    }
}
