//! Contact phone numbers.
//!
//! Contacts are shipping destinations in Russia, so the accepted format is the
//! domestic one: an optional `8` or `+7` trunk prefix, an optional three-digit
//! area code (parenthesized or not), then seven to ten digits with optional
//! spaces and hyphens.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((8|\+7)[\- ]?)?(\(?\d{3}\)?[\- ]?)?[\d\- ]{7,10}$").expect("Invalid regex")
});

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone cannot be empty")]
    Empty,
    /// The input is longer than the column allows.
    #[error("phone must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input does not look like a Russian phone number.
    #[error("invalid Russian phone number")]
    Format,
}

/// A validated contact phone number, stored as entered.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Column width of `contact.phone`.
    pub const MAX_LENGTH: usize = 20;

    /// Parse a `Phone`.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneError`] if the input is empty, too long, or does not
    /// match the domestic format.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(PhoneError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !PHONE_RE.is_match(s) {
            return Err(PhoneError::Format);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the phone number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Phone {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Phone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_formats() {
        for input in [
            "+79134567890",
            "89134567890",
            "+7 (913) 456-78-90",
            "8-913-456-78-90",
            "4567890",
        ] {
            assert!(Phone::parse(input).is_ok(), "{input} should be accepted");
        }
    }

    #[test]
    fn test_rejects_letters_and_foreign_prefix() {
        assert_eq!(Phone::parse("call me"), Err(PhoneError::Format));
        assert_eq!(Phone::parse("+1 555 0100 12"), Err(PhoneError::Format));
    }

    #[test]
    fn test_rejects_empty_and_long() {
        assert_eq!(Phone::parse("   "), Err(PhoneError::Empty));
        assert!(matches!(
            Phone::parse(&"1".repeat(21)),
            Err(PhoneError::TooLong { max: 20 })
        ));
    }
}
