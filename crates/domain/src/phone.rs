//! Phone number normalization
//!
//! The API takes bare 10-digit national numbers. Input may carry the `+91`
//! country code, spaces or dashes.

/// Country calling code prefixed to national numbers.
pub const COUNTRY_CODE: &str = "+91";

/// Length of a national mobile number.
pub const PHONE_NUMBER_LENGTH: usize = 10;

const COUNTRY_DIGITS: &str = "91";

fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Normalizes a phone number to the national form the API expects.
///
/// Non-digits are dropped; a leading `91` is removed when it makes a
/// 12-digit number, or when the input was written with `+91`.
///
/// ```
/// use prohero_domain::phone::format_phone_for_api;
///
/// assert_eq!(format_phone_for_api("+91 98765 43210"), "9876543210");
/// assert_eq!(format_phone_for_api("919876543210"), "9876543210");
/// assert_eq!(format_phone_for_api("9876543210"), "9876543210");
/// ```
#[must_use]
pub fn format_phone_for_api(phone: &str) -> String {
    let cleaned = digits_only(phone);

    if cleaned.len() == PHONE_NUMBER_LENGTH + COUNTRY_DIGITS.len()
        && cleaned.starts_with(COUNTRY_DIGITS)
    {
        return cleaned[COUNTRY_DIGITS.len()..].to_string();
    }

    if cleaned.len() == PHONE_NUMBER_LENGTH {
        return cleaned;
    }

    if phone.trim_start().starts_with(COUNTRY_CODE)
        && let Some(national) = cleaned.strip_prefix(COUNTRY_DIGITS)
    {
        return national.to_string();
    }

    cleaned
}

/// True for 10 digits, or 12 digits starting with the country code.
#[must_use]
pub fn is_valid_phone_number(phone: &str) -> bool {
    let cleaned = digits_only(phone);
    cleaned.len() == PHONE_NUMBER_LENGTH
        || (cleaned.len() == PHONE_NUMBER_LENGTH + COUNTRY_DIGITS.len()
            && cleaned.starts_with(COUNTRY_DIGITS))
}

/// Keeps at most [`PHONE_NUMBER_LENGTH`] digits of user input.
#[must_use]
pub fn phone_input_digits(input: &str) -> String {
    digits_only(input)
        .chars()
        .take(PHONE_NUMBER_LENGTH)
        .collect()
}

/// Renders typed digits as `XXXXX XXXXX`.
#[must_use]
pub fn format_phone_display(input: &str) -> String {
    let digits = phone_input_digits(input);
    if digits.len() > 5 {
        format!("{} {}", &digits[..5], &digits[5..])
    } else {
        digits
    }
}

/// Prefixes national digits with the country code.
#[must_use]
pub fn full_phone_number(digits: &str) -> String {
    let compact: String = digits.chars().filter(|c| !c.is_whitespace()).collect();
    format!("{COUNTRY_CODE}{compact}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_phone_for_api() {
        assert_eq!(format_phone_for_api("+91 98765 43210"), "9876543210");
        assert_eq!(format_phone_for_api("919876543210"), "9876543210");
        assert_eq!(format_phone_for_api("9876543210"), "9876543210");
        assert_eq!(format_phone_for_api("98765-43210"), "9876543210");
    }

    #[test]
    fn test_format_phone_for_api_short_numbers() {
        assert_eq!(format_phone_for_api("+91 123"), "123");
        assert_eq!(format_phone_for_api("12345"), "12345");
        assert_eq!(format_phone_for_api(""), "");
    }

    #[test]
    fn test_is_valid_phone_number() {
        assert!(is_valid_phone_number("9876543210"));
        assert!(is_valid_phone_number("+91 98765 43210"));
        assert!(!is_valid_phone_number("819876543210"));
        assert!(!is_valid_phone_number("98765"));
    }

    #[test]
    fn test_display_and_full_number() {
        assert_eq!(format_phone_display("98765"), "98765");
        assert_eq!(format_phone_display("9876543210999"), "98765 43210");
        assert_eq!(full_phone_number("98765 43210"), "+919876543210");
    }
}
