//! Kenyan mobile number (MSISDN) handling.
//!
//! Customers type phone numbers in whatever shape they are used to:
//! `0712 345 678`, `+254712345678`, `712345678`. The mobile-money gateway only
//! accepts the international form without a plus sign (`254712345678`), so
//! every number passes through [`normalize_phone`] before it is validated.

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Safaricom/Airtel mobile ranges in international form: `2547xxxxxxxx` or
/// `2541xxxxxxxx`.
static MSISDN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // literal pattern, checked by tests
    Regex::new(r"^254[71]\d{8}$").expect("valid MSISDN pattern")
});

/// Errors that can occur when parsing a [`MsisdnKe`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The normalized number is not a Kenyan mobile number.
    #[error("invalid phone number {0}, expected format 2547XXXXXXXX or 2541XXXXXXXX")]
    Invalid(String),
}

/// Normalize a Kenyan phone number to international format without `+`.
///
/// Whitespace, dashes and a leading `+` are removed first. Then:
/// - `0` followed by 9 digits becomes `254` + the 9 digits
/// - numbers already starting with `254` are returned unchanged
/// - a bare 9-digit subscriber number starting with `7` or `1` gets `254` prefixed
///
/// Anything else is returned cleaned but otherwise untouched; use
/// [`is_valid_phone`] to reject it.
///
/// ```
/// use soko_core::normalize_phone;
///
/// assert_eq!(normalize_phone("0712345678"), "254712345678");
/// assert_eq!(normalize_phone("+254 712 345 678"), "254712345678");
/// assert_eq!(normalize_phone("712345678"), "254712345678");
/// ```
#[must_use]
pub fn normalize_phone(input: &str) -> String {
    let cleaned: String = input
        .trim()
        .trim_start_matches('+')
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    let all_digits = cleaned.chars().all(|c| c.is_ascii_digit());

    if cleaned.starts_with("254") {
        return cleaned;
    }

    if all_digits
        && cleaned.len() == 10
        && let Some(rest) = cleaned.strip_prefix('0')
    {
        return format!("254{rest}");
    }

    if all_digits && cleaned.len() == 9 && (cleaned.starts_with('7') || cleaned.starts_with('1')) {
        return format!("254{cleaned}");
    }

    cleaned
}

/// Whether `s` is exactly a normalized Kenyan mobile number (`254[71]` + 8 digits).
#[must_use]
pub fn is_valid_phone(s: &str) -> bool {
    MSISDN_PATTERN.is_match(s)
}

/// A validated Kenyan mobile number in international format (`2547XXXXXXXX`).
///
/// This is the only phone representation the payment flow accepts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct MsisdnKe(String);

impl MsisdnKe {
    /// Normalize and validate a phone number.
    ///
    /// # Errors
    ///
    /// Returns `PhoneError::Empty` for blank input and `PhoneError::Invalid` when
    /// the normalized number is not a Kenyan mobile number.
    pub fn parse(input: &str) -> Result<Self, PhoneError> {
        if input.trim().is_empty() {
            return Err(PhoneError::Empty);
        }

        let normalized = normalize_phone(input);
        if is_valid_phone(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(PhoneError::Invalid(normalized))
        }
    }

    /// Returns the number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse as an integer, the form the STK push payload uses for
    /// `PartyA` and `PhoneNumber`.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        // Validated as 12 ASCII digits on construction.
        self.0.parse().unwrap_or_default()
    }

    /// Mask the subscriber digits for logging (`254712***678`).
    #[must_use]
    pub fn masked(&self) -> String {
        let head = self.0.get(..6).unwrap_or_default();
        let tail = self.0.get(9..).unwrap_or_default();
        format!("{head}***{tail}")
    }
}

impl fmt::Display for MsisdnKe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MsisdnKe {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MsisdnKe> for String {
    fn from(phone: MsisdnKe) -> Self {
        phone.0
    }
}

impl AsRef<str> for MsisdnKe {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_leading_zero() {
        assert_eq!(normalize_phone("0712345678"), "254712345678");
        assert_eq!(normalize_phone("0110345678"), "254110345678");
    }

    #[test]
    fn test_normalize_already_international() {
        assert_eq!(normalize_phone("254712345678"), "254712345678");
        assert_eq!(normalize_phone("+254712345678"), "254712345678");
        // 254 prefix is kept even when the rest is malformed
        assert_eq!(normalize_phone("2548"), "2548");
    }

    #[test]
    fn test_normalize_bare_subscriber_number() {
        assert_eq!(normalize_phone("712345678"), "254712345678");
        assert_eq!(normalize_phone("112345678"), "254112345678");
        // Only 7 and 1 ranges are treated as subscriber numbers
        assert_eq!(normalize_phone("812345678"), "812345678");
    }

    #[test]
    fn test_normalize_strips_separators() {
        assert_eq!(normalize_phone(" 0712 345-678 "), "254712345678");
    }

    #[test]
    fn test_normalize_leaves_unknown_shapes() {
        assert_eq!(normalize_phone("07123"), "07123");
        assert_eq!(normalize_phone("abc"), "abc");
    }

    #[test]
    fn test_is_valid_phone() {
        assert!(is_valid_phone("254712345678"));
        assert!(is_valid_phone("254112345678"));
        assert!(!is_valid_phone("254812345678"));
        assert!(!is_valid_phone("25471234567"));
        assert!(!is_valid_phone("2547123456789"));
        assert!(!is_valid_phone("0712345678"));
        assert!(!is_valid_phone(" 254712345678"));
    }

    #[test]
    fn test_msisdn_parse() {
        let phone = MsisdnKe::parse("0712 345 678").expect("valid");
        assert_eq!(phone.as_str(), "254712345678");
        assert_eq!(phone.as_u64(), 254_712_345_678);
        assert_eq!(phone.masked(), "254712***678");
    }

    #[test]
    fn test_msisdn_parse_errors() {
        assert_eq!(MsisdnKe::parse("   "), Err(PhoneError::Empty));
        assert_eq!(
            MsisdnKe::parse("0812345678"),
            Err(PhoneError::Invalid("254812345678".to_string()))
        );
    }

    #[test]
    fn test_msisdn_deserialize_validates() {
        let phone: MsisdnKe = serde_json::from_str("\"0712345678\"").expect("valid");
        assert_eq!(phone.as_str(), "254712345678");
        assert!(serde_json::from_str::<MsisdnKe>("\"12345\"").is_err());
    }
}
