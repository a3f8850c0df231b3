//! Signed-in session state.

mod controller;

pub use controller::{LogoutPolicy, ParseLogoutPolicyError, SessionController, SessionSnapshot};
