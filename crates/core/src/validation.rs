//! Local validation run before a request reaches the backend.
//!
//! Every error's `Display` text is the warning shown to the shopper, so the
//! storefront can surface these without further mapping.

use crate::types::{Address, AddressId, LineItem, Price, Username, UsernameError, total_value};

/// Minimum password length for new accounts.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Credential validation failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialsError {
    /// Username missing or malformed.
    #[error(transparent)]
    Username(#[from] UsernameError),
    /// Password field left empty.
    #[error("Password is a required field")]
    MissingPassword,
    /// Password shorter than [`MIN_PASSWORD_LENGTH`].
    #[error("Password must be at least {min} characters long")]
    PasswordTooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// Password and confirmation differ.
    #[error("Passwords do not match")]
    PasswordMismatch,
}

/// Checkout validation failures, in the order they are checked.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// Wallet balance below the cart total.
    #[error("You do not have enough balance in your wallet for this purchase")]
    InsufficientBalance {
        /// Balance on record.
        balance: Price,
        /// Cart total.
        total: Price,
    },
    /// The account has no addresses on file.
    #[error("Please add a new address before proceeding.")]
    NoAddresses,
    /// No address (or an unknown one) was selected.
    #[error("Please select one shipping address to proceed.")]
    NoAddressSelected,
}

/// New-address validation failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The address text is blank.
    #[error("Address cannot be empty")]
    Empty,
}

/// Credentials that passed local validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: Username,
    pub password: String,
}

/// Validate login form input.
///
/// # Errors
///
/// Returns an error if the username or password is missing.
pub fn validate_login(username: &str, password: &str) -> Result<Credentials, CredentialsError> {
    let username = Username::parse(username)?;

    if password.is_empty() {
        return Err(CredentialsError::MissingPassword);
    }

    Ok(Credentials {
        username,
        password: password.to_owned(),
    })
}

/// Validate registration form input.
///
/// # Errors
///
/// Returns the first failing rule: username present and at least 6
/// characters, password present and at least 6 characters, confirmation
/// matching.
pub fn validate_registration(
    username: &str,
    password: &str,
    confirm_password: &str,
) -> Result<Credentials, CredentialsError> {
    let username = Username::parse_new(username)?;

    if password.is_empty() {
        return Err(CredentialsError::MissingPassword);
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(CredentialsError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }

    if password != confirm_password {
        return Err(CredentialsError::PasswordMismatch);
    }

    Ok(Credentials {
        username,
        password: password.to_owned(),
    })
}

/// Validate an order before it is placed.
///
/// `balance` is the last balance the backend confirmed. When it is `None`
/// the backend has not reported one since the last order, so the balance
/// check is left to the backend.
///
/// Returns the selected address on success.
///
/// # Errors
///
/// Returns the first failing check: sufficient balance, at least one
/// address on file, a selected address that is on file.
pub fn validate_checkout(
    balance: Option<Price>,
    items: &[LineItem],
    addresses: &[Address],
    selected: Option<&AddressId>,
) -> Result<AddressId, CheckoutError> {
    let total = total_value(items);

    if let Some(balance) = balance
        && balance < total
    {
        return Err(CheckoutError::InsufficientBalance { balance, total });
    }

    if addresses.is_empty() {
        return Err(CheckoutError::NoAddresses);
    }

    selected
        .filter(|id| addresses.iter().any(|address| &address.id == *id))
        .cloned()
        .ok_or(CheckoutError::NoAddressSelected)
}

/// Validate the text of a new address.
///
/// # Errors
///
/// Returns [`AddressError::Empty`] if the text is blank.
pub fn validate_new_address(text: &str) -> Result<String, AddressError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AddressError::Empty);
    }
    Ok(trimmed.to_owned())
}
