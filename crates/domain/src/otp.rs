//! One-time code entry state

use crate::error::{DomainError, DomainResult};

/// Number of digits in an OTP.
pub const OTP_LENGTH: usize = 6;

/// Seconds before an OTP may be re-sent.
pub const OTP_RESEND_TIMEOUT_SECS: u32 = 30;

/// Six-slot digit buffer filled one position at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OtpEntry {
    digits: [Option<char>; OTP_LENGTH],
}

impl OtpEntry {
    /// Creates an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            digits: [None; OTP_LENGTH],
        }
    }

    /// Writes a digit at `index`; returns the full code once every slot is
    /// filled.
    ///
    /// # Errors
    ///
    /// Fails when `index` is out of range or `digit` is not an ASCII digit.
    pub fn set_digit(&mut self, index: usize, digit: char) -> DomainResult<Option<String>> {
        if !digit.is_ascii_digit() {
            return Err(DomainError::InvalidOtp(format!("'{digit}' is not a digit")));
        }
        let slot = self
            .digits
            .get_mut(index)
            .ok_or_else(|| DomainError::InvalidOtp(format!("position {index} out of range")))?;
        *slot = Some(digit);
        Ok(self.code())
    }

    /// Clears the slot at `index`, if any.
    pub fn clear_digit(&mut self, index: usize) {
        if let Some(slot) = self.digits.get_mut(index) {
            *slot = None;
        }
    }

    /// Replaces the buffer with a pasted code.
    ///
    /// # Errors
    ///
    /// Fails unless `code` is exactly [`OTP_LENGTH`] ASCII digits.
    pub fn set_code(&mut self, code: &str) -> DomainResult<String> {
        let code = code.trim();
        if code.len() != OTP_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::InvalidOtp(format!(
                "expected {OTP_LENGTH} digits"
            )));
        }
        for (slot, digit) in self.digits.iter_mut().zip(code.chars()) {
            *slot = Some(digit);
        }
        Ok(code.to_string())
    }

    /// Empties every slot.
    pub fn clear(&mut self) {
        self.digits = [None; OTP_LENGTH];
    }

    /// The complete code, or `None` while any slot is empty.
    #[must_use]
    pub fn code(&self) -> Option<String> {
        self.digits.iter().copied().collect()
    }
}

/// Countdown that gates OTP resends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResendCountdown {
    remaining: u32,
}

impl ResendCountdown {
    /// Restarts at [`OTP_RESEND_TIMEOUT_SECS`].
    pub const fn start(&mut self) {
        self.remaining = OTP_RESEND_TIMEOUT_SECS;
    }

    /// Advances by one second; stops at zero.
    pub const fn tick(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }

    /// Seconds left before a resend is allowed.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// True once the countdown reached zero.
    #[must_use]
    pub const fn can_resend(&self) -> bool {
        self.remaining == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_code_completes_on_last_digit() {
        let mut entry = OtpEntry::new();
        for (index, digit) in "12345".chars().enumerate() {
            assert_eq!(entry.set_digit(index, digit).unwrap(), None);
        }
        assert_eq!(entry.code(), None);
        assert_eq!(entry.set_digit(5, '6').unwrap(), Some("123456".to_string()));
        assert_eq!(entry.code().as_deref(), Some("123456"));
    }

    #[test]
    fn test_clear_digit_reopens_slot() {
        let mut entry = OtpEntry::new();
        entry.set_code("654321").unwrap();
        entry.clear_digit(2);
        assert_eq!(entry.code(), None);
        entry.set_digit(2, '9').unwrap();
        assert_eq!(entry.code().as_deref(), Some("659321"));
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut entry = OtpEntry::new();
        assert!(entry.set_digit(0, 'x').is_err());
        assert!(entry.set_digit(6, '1').is_err());
        assert!(entry.set_code("12345").is_err());
        assert!(entry.set_code("12a456").is_err());
    }

    #[test]
    fn test_countdown() {
        let mut countdown = ResendCountdown::default();
        assert!(countdown.can_resend());
        countdown.start();
        assert_eq!(countdown.remaining(), 30);
        for _ in 0..29 {
            countdown.tick();
        }
        assert!(!countdown.can_resend());
        assert_eq!(countdown.tick(), 0);
        assert_eq!(countdown.tick(), 0);
        assert!(countdown.can_resend());
    }
}
