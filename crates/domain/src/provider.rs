//! Provider duty status

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Whether the provider is available to receive work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DutyStatus {
    /// Available.
    OnDuty,
    /// Not available.
    #[default]
    OffDuty,
}

impl DutyStatus {
    /// Returns true when on duty.
    #[must_use]
    pub const fn is_on_duty(self) -> bool {
        matches!(self, Self::OnDuty)
    }

    /// The opposite status.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::OnDuty => Self::OffDuty,
            Self::OffDuty => Self::OnDuty,
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OnDuty => "ON DUTY",
            Self::OffDuty => "OFF DUTY",
        }
    }
}

impl From<bool> for DutyStatus {
    fn from(on_duty: bool) -> Self {
        if on_duty { Self::OnDuty } else { Self::OffDuty }
    }
}

impl From<DutyStatus> for bool {
    fn from(status: DutyStatus) -> Self {
        status.is_on_duty()
    }
}

impl fmt::Display for DutyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DutyStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "on" | "true" | "on-duty" | "on_duty" => Ok(Self::OnDuty),
            "off" | "false" | "off-duty" | "off_duty" => Ok(Self::OffDuty),
            other => Err(DomainError::InvalidDutyStatus(other.to_string())),
        }
    }
}

/// Response of `GET /api/providers/me/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    /// Current duty flag.
    pub on_duty: bool,
    /// Timestamp of the last change.
    #[serde(default)]
    pub last_status_change: Option<String>,
}

/// Body of `PATCH /api/providers/me/duty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDutyStatusRequest {
    /// Requested duty flag.
    pub on_duty: bool,
}
