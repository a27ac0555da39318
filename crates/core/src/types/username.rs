//! Username type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Username`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UsernameError {
    /// The input is empty or only whitespace.
    #[error("Username is a required field")]
    Empty,
    /// The input is shorter than the registration minimum.
    #[error("Username must be at least {min} characters long")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The input is too long.
    #[error("Username must be at most {max} characters long")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// A QKart account username.
///
/// Surrounding whitespace is trimmed. Login accepts any non-empty username;
/// registration additionally requires [`Username::MIN_LENGTH`] characters
/// (see [`Username::parse_new`]).
///
/// ## Examples
///
/// ```
/// use qkart_core::Username;
///
/// assert!(Username::parse("crio").is_ok());
/// assert!(Username::parse("").is_err());
///
/// assert!(Username::parse_new("crio").is_err());   // too short to register
/// assert!(Username::parse_new("crio.do").is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Minimum length for a newly registered username.
    pub const MIN_LENGTH: usize = 6;

    /// Maximum length of a username.
    pub const MAX_LENGTH: usize = 64;

    /// Parse an existing account's username.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is blank or longer than 64 characters.
    pub fn parse(s: &str) -> Result<Self, UsernameError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(UsernameError::Empty);
        }

        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Parse a username for a new account.
    ///
    /// # Errors
    ///
    /// Returns an error if [`Username::parse`] fails or the username is
    /// shorter than 6 characters.
    pub fn parse_new(s: &str) -> Result<Self, UsernameError> {
        let username = Self::parse(s)?;

        if username.0.chars().count() < Self::MIN_LENGTH {
            return Err(UsernameError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }

        Ok(username)
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Username {
    type Err = UsernameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        let username = Username::parse("  shopper  ").unwrap();
        assert_eq!(username.as_str(), "shopper");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Username::parse(""), Err(UsernameError::Empty));
        assert_eq!(Username::parse("   "), Err(UsernameError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "a".repeat(65);
        assert!(matches!(
            Username::parse(&long),
            Err(UsernameError::TooLong { max: 64 })
        ));
    }

    #[test]
    fn test_parse_new_requires_minimum_length() {
        assert_eq!(
            Username::parse_new("abcde"),
            Err(UsernameError::TooShort { min: 6 })
        );
        assert!(Username::parse_new("abcdef").is_ok());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            UsernameError::Empty.to_string(),
            "Username is a required field"
        );
        assert_eq!(
            UsernameError::TooShort { min: 6 }.to_string(),
            "Username must be at least 6 characters long"
        );
    }
}
