//! Profile, bookings and account endpoints.

use prohero_domain::{ApiResponse, HttpMethod, UpdateProfileRequest, UserProfile, endpoints};
use serde_json::Value;

use crate::api::{ApiClient, RequestAuth};

/// Bearer-authenticated user endpoints.
#[derive(Debug, Clone)]
pub struct UserService {
    api: ApiClient,
}

impl UserService {
    /// Creates a service over the shared API client.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// `GET /api/user/profile`
    pub async fn get_profile(&self) -> ApiResponse<UserProfile> {
        self.api
            .get(endpoints::USER_PROFILE, RequestAuth::Bearer)
            .await
    }

    /// `PUT /api/user/profile`
    pub async fn update_profile(&self, update: &UpdateProfileRequest) -> ApiResponse<UserProfile> {
        self.api
            .send_json(endpoints::USER_PROFILE, HttpMethod::Put, update, RequestAuth::Bearer)
            .await
    }

    /// `GET /api/user/bookings`
    pub async fn get_bookings(&self) -> ApiResponse<Vec<Value>> {
        self.api
            .get(endpoints::USER_BOOKINGS, RequestAuth::Bearer)
            .await
    }

    /// `DELETE /api/user/account`
    pub async fn delete_account(&self) -> ApiResponse<Value> {
        self.api
            .delete(endpoints::USER_ACCOUNT, RequestAuth::Bearer)
            .await
    }
}
