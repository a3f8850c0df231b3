//! Phone, name and OTP entry for signing in.

use prohero_domain::{
    DomainError, NameError, OtpEntry, ResendCountdown, User,
    phone::{self, PHONE_NUMBER_LENGTH},
    split_full_name, validate_full_name,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::{AuthService, RegistrationVerification};
use crate::error::ApplicationError;
use crate::session::SessionController;

/// Screen the flow is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginStep {
    /// Entering the phone number.
    #[default]
    Phone,
    /// New user entering a full name.
    Register,
    /// Entering the 6-digit code.
    Otp,
}

/// Why a login step could not complete. Messages are shown to the user.
#[derive(Debug, Error)]
pub enum LoginError {
    /// The phone number does not have 10 digits.
    #[error("Please enter a valid 10-digit mobile number.")]
    InvalidPhone,

    /// The registration name was rejected.
    #[error(transparent)]
    InvalidName(#[from] NameError),

    /// The code has empty slots.
    #[error("Please enter the complete 6-digit OTP.")]
    IncompleteOtp,

    /// A digit or pasted code was not numeric.
    #[error(transparent)]
    InvalidOtp(#[from] DomainError),

    /// The resend countdown has not finished.
    #[error("Please wait {0} seconds before requesting a new OTP.")]
    ResendNotReady(u32),

    /// The operation does not apply to the current step.
    #[error("not available on the {0:?} step")]
    WrongStep(LoginStep),

    /// The server refused the request.
    #[error("{0}")]
    Rejected(String),

    /// Storing the session failed.
    #[error(transparent)]
    Application(#[from] ApplicationError),
}

/// Transient sign-in state: phone digits, registration name, OTP buffer and
/// resend countdown. Nothing here is persisted.
#[derive(Debug, Clone, Default)]
pub struct LoginFlow {
    step: LoginStep,
    phone_digits: String,
    full_name: String,
    is_registered: Option<bool>,
    otp: OtpEntry,
    countdown: ResendCountdown,
}

impl LoginFlow {
    /// Starts on the phone step.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current step.
    #[must_use]
    pub const fn step(&self) -> LoginStep {
        self.step
    }

    /// Typed digits, at most 10.
    #[must_use]
    pub fn phone_digits(&self) -> &str {
        &self.phone_digits
    }

    /// Typed digits rendered as `XXXXX XXXXX`.
    #[must_use]
    pub fn display_phone(&self) -> String {
        phone::format_phone_display(&self.phone_digits)
    }

    /// Name entered on the registration step.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// `Some(true)` for an existing account, `Some(false)` for a new one,
    /// `None` before the phone is submitted.
    #[must_use]
    pub const fn is_registered(&self) -> Option<bool> {
        self.is_registered
    }

    /// Seconds until a resend is allowed.
    #[must_use]
    pub const fn resend_remaining(&self) -> u32 {
        self.countdown.remaining()
    }

    /// Replaces the phone input, keeping digits only.
    pub fn set_phone(&mut self, input: &str) {
        self.phone_digits = phone::phone_input_digits(input);
    }

    fn api_phone(&self) -> String {
        phone::format_phone_for_api(&phone::full_phone_number(&self.phone_digits))
    }

    fn is_existing_user(&self) -> bool {
        self.is_registered == Some(true)
    }

    /// Submits the phone number and sends the matching OTP.
    ///
    /// A registration OTP is tried first; when the server says the number is
    /// already registered a login OTP is sent instead. Existing users go
    /// straight to the OTP step, new users to the registration step.
    ///
    /// # Errors
    ///
    /// `InvalidPhone` unless exactly 10 digits were entered.
    pub async fn submit_phone(&mut self, auth: &AuthService) -> Result<LoginStep, LoginError> {
        if self.phone_digits.len() != PHONE_NUMBER_LENGTH {
            return Err(LoginError::InvalidPhone);
        }

        let registered = self.check_registration(auth).await;
        self.is_registered = Some(registered);
        if registered {
            self.step = LoginStep::Otp;
            self.countdown.start();
        } else {
            self.step = LoginStep::Register;
        }
        info!(registered, step = ?self.step, "phone submitted");
        Ok(self.step)
    }

    async fn check_registration(&self, auth: &AuthService) -> bool {
        let phone = self.api_phone();

        let register = auth.send_register_otp(&phone).await;
        if register.success {
            return false;
        }

        let message = register.message.to_lowercase();
        if message.contains("already registered") || message.contains("already exists") {
            info!("number already registered, sending login OTP");
            let login = auth.send_login_otp(&phone).await;
            if !login.success {
                warn!(message = %login.message, "login OTP failed for a registered number");
            }
            return true;
        }

        warn!(message = %register.message, "registration OTP failed, trying login");
        auth.send_login_otp(&phone).await.success
    }

    /// Accepts the registration name and moves to the OTP step.
    ///
    /// # Errors
    ///
    /// `WrongStep` outside the registration step, `InvalidName` when the
    /// name breaks a rule.
    pub fn submit_name(&mut self, name: &str) -> Result<(), LoginError> {
        if self.step != LoginStep::Register {
            return Err(LoginError::WrongStep(self.step));
        }
        validate_full_name(name)?;
        self.full_name = name.trim().to_string();
        self.step = LoginStep::Otp;
        self.countdown.start();
        Ok(())
    }

    /// Writes one digit; returns the code when the last slot fills.
    ///
    /// # Errors
    ///
    /// `InvalidOtp` for a non-digit or an index past the last slot.
    pub fn enter_digit(&mut self, index: usize, digit: char) -> Result<Option<String>, LoginError> {
        Ok(self.otp.set_digit(index, digit)?)
    }

    /// Clears one slot.
    pub fn clear_digit(&mut self, index: usize) {
        self.otp.clear_digit(index);
    }

    /// Fills every slot from a pasted code.
    ///
    /// # Errors
    ///
    /// `InvalidOtp` unless the code is exactly 6 digits.
    pub fn set_code(&mut self, code: &str) -> Result<String, LoginError> {
        Ok(self.otp.set_code(code)?)
    }

    /// Advances the resend countdown by one second.
    pub const fn tick(&mut self) -> u32 {
        self.countdown.tick()
    }

    /// Re-sends the OTP for the current flow.
    ///
    /// # Errors
    ///
    /// `ResendNotReady` while the countdown runs, `Rejected` when the server
    /// refuses.
    pub async fn resend(&mut self, auth: &AuthService) -> Result<(), LoginError> {
        if self.step != LoginStep::Otp {
            return Err(LoginError::WrongStep(self.step));
        }
        if !self.countdown.can_resend() {
            return Err(LoginError::ResendNotReady(self.countdown.remaining()));
        }

        let phone = self.api_phone();
        let response = if self.is_existing_user() {
            auth.send_login_otp(&phone).await
        } else {
            auth.send_register_otp(&phone).await
        };

        if !response.success {
            return Err(LoginError::Rejected(non_empty_or(
                response.message,
                "Failed to resend OTP",
            )));
        }
        self.otp.clear();
        self.countdown.start();
        info!("OTP re-sent");
        Ok(())
    }

    /// Verifies the entered code and signs the session in.
    ///
    /// # Errors
    ///
    /// `IncompleteOtp` with empty slots, `Rejected` when the server refuses
    /// the code, `Application` when the session cannot be stored.
    pub async fn verify(
        &mut self,
        auth: &AuthService,
        session: &SessionController,
    ) -> Result<User, LoginError> {
        if self.step != LoginStep::Otp {
            return Err(LoginError::WrongStep(self.step));
        }
        let code = self.otp.code().ok_or(LoginError::IncompleteOtp)?;
        let phone = self.api_phone();

        let response = if self.is_existing_user() {
            auth.verify_login_otp(&phone, &code).await?
        } else {
            let (first_name, last_name) = split_full_name(&self.full_name);
            auth.verify_register_otp(RegistrationVerification {
                phone,
                otp: code,
                first_name,
                last_name,
                email: None,
            })
            .await?
        };

        let tokens = match response.data {
            Some(tokens) if response.success && tokens.user.is_some() => tokens,
            _ => {
                warn!(message = %response.message, "OTP verification failed");
                return Err(LoginError::Rejected(non_empty_or(
                    response.message,
                    "Invalid OTP",
                )));
            }
        };

        session.sign_in(&tokens).await?;
        let user = session
            .snapshot()
            .await
            .user
            .ok_or(LoginError::Application(ApplicationError::NotSignedIn))?;
        info!(user_id = %user.id, "signed in");
        Ok(user)
    }

    /// Returns to the phone step, forgetting the name, the registration
    /// check and the code.
    pub fn back_to_phone(&mut self) {
        self.step = LoginStep::Phone;
        self.full_name.clear();
        self.is_registered = None;
        self.otp.clear();
    }
}

fn non_empty_or(message: String, fallback: &str) -> String {
    if message.is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
