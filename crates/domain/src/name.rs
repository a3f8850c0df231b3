//! Registration name validation

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Minimum trimmed length of a full name.
pub const MIN_NAME_LENGTH: usize = 2;
/// Maximum trimmed length of a full name.
pub const MAX_NAME_LENGTH: usize = 50;
/// Maximum number of words in a full name.
pub const MAX_NAME_WORDS: usize = 4;

#[allow(clippy::expect_used)]
static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z\s\-.']+$").expect("name pattern is valid"));

/// Why a full name was rejected. The messages are shown to the user.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    /// Nothing but whitespace.
    #[error("Please enter your full name.")]
    Empty,
    /// Shorter than [`MIN_NAME_LENGTH`].
    #[error("Name must be at least 2 characters long.")]
    TooShort,
    /// Longer than [`MAX_NAME_LENGTH`].
    #[error("Name must be less than 50 characters.")]
    TooLong,
    /// Contains something other than letters, spaces, `-`, `.` or `'`.
    #[error("Name can only contain letters, spaces, hyphens, dots, and apostrophes.")]
    InvalidCharacters,
    /// More than [`MAX_NAME_WORDS`] words.
    #[error("Please enter a shorter name (maximum 4 words).")]
    TooManyWords,
}

/// Validates a full name typed during registration.
///
/// # Errors
///
/// Returns the first rule the trimmed name breaks.
pub fn validate_full_name(name: &str) -> Result<(), NameError> {
    let trimmed = name.trim();
    let length = trimmed.chars().count();

    if trimmed.is_empty() {
        return Err(NameError::Empty);
    }
    if length < MIN_NAME_LENGTH {
        return Err(NameError::TooShort);
    }
    if length > MAX_NAME_LENGTH {
        return Err(NameError::TooLong);
    }
    if !NAME_PATTERN.is_match(trimmed) {
        return Err(NameError::InvalidCharacters);
    }
    if trimmed.split_whitespace().count() > MAX_NAME_WORDS {
        return Err(NameError::TooManyWords);
    }
    Ok(())
}

/// Splits a full name into the first word and the remaining words.
#[must_use]
pub fn split_full_name(name: &str) -> (String, String) {
    let mut parts = name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, rest)
}
