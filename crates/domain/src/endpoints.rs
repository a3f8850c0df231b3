//! REST endpoint paths, relative to the API base URL.

/// `POST { phone }`
pub const LOGIN_SEND_OTP: &str = "/api/auth/provider/login/send-otp";
/// `POST { phone, otp }`
pub const LOGIN_VERIFY_OTP: &str = "/api/auth/provider/login/verify-otp";
/// `POST { phone }`
pub const REGISTER_SEND_OTP: &str = "/api/auth/provider/register/send-otp";
/// `POST { phone, otp, firstName, lastName, email? }`
pub const REGISTER_VERIFY_OTP: &str = "/api/auth/register/verify-otp";
/// `POST { refreshToken }`
pub const REFRESH_TOKEN: &str = "/api/auth/provider/refresh";
/// `POST { token }`
pub const VALIDATE_TOKEN: &str = "/api/auth/validate/provider";
/// `GET` / `PUT`
pub const USER_PROFILE: &str = "/api/user/profile";
/// `GET`
pub const USER_BOOKINGS: &str = "/api/user/bookings";
/// `DELETE`
pub const USER_ACCOUNT: &str = "/api/user/account";
/// `GET`
pub const PROVIDER_STATUS: &str = "/api/providers/me/status";
/// `PATCH { onDuty }`
pub const PROVIDER_DUTY: &str = "/api/providers/me/duty";

/// Joins a base URL and an endpoint path without doubling the slash.
#[must_use]
pub fn join(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join() {
        assert_eq!(
            join("https://api.example.com/", USER_PROFILE),
            "https://api.example.com/api/user/profile"
        );
        assert_eq!(
            join("https://api.example.com", "api/user/profile"),
            "https://api.example.com/api/user/profile"
        );
    }
}
