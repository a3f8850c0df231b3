//! Provider duty status endpoints.

use prohero_domain::{
    ApiResponse, HttpMethod, ProviderStatus, UpdateDutyStatusRequest, endpoints,
};

use crate::api::{ApiClient, RequestAuth};

/// Bearer-authenticated provider endpoints.
#[derive(Debug, Clone)]
pub struct ProviderService {
    api: ApiClient,
}

impl ProviderService {
    /// Creates a service over the shared API client.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// `GET /api/providers/me/status`
    pub async fn get_status(&self) -> ApiResponse<ProviderStatus> {
        self.api
            .get(endpoints::PROVIDER_STATUS, RequestAuth::Bearer)
            .await
    }

    /// `PATCH /api/providers/me/duty`
    pub async fn update_duty_status(&self, on_duty: bool) -> ApiResponse<ProviderStatus> {
        self.api
            .send_json(
                endpoints::PROVIDER_DUTY,
                HttpMethod::Patch,
                &UpdateDutyStatusRequest { on_duty },
                RequestAuth::Bearer,
            )
            .await
    }
}
