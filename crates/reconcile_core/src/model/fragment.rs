//! Incoming contact fragment.
//!
//! # Responsibility
//! - Normalize caller input (trim, empty-as-absent).
//! - Reject fragments that cannot identify anyone before any store access.
//!
//! # Invariants
//! - A constructed `ContactFragment` always has at least one field.
//! - Matching downstream is exact equality on the normalized values.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@.]+$").expect("valid email regex")
});
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9 ().\-]*[0-9][0-9 ().\-]*$").expect("valid phone regex"));

/// Reasons a fragment is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentError {
    /// Both email and phone number are absent or blank.
    MissingContactFields,
    /// Email does not look like `local@domain.tld`.
    InvalidEmail,
    /// Phone number contains characters other than digits and separators.
    InvalidPhoneNumber,
}

impl Display for FragmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingContactFields => {
                write!(f, "At least one of email or phoneNumber is required")
            }
            Self::InvalidEmail => write!(f, "Must be a valid email address"),
            Self::InvalidPhoneNumber => write!(f, "Must be a valid phone number"),
        }
    }
}

impl Error for FragmentError {}

/// Validated partial contact submitted for resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactFragment {
    email: Option<String>,
    phone_number: Option<String>,
}

impl ContactFragment {
    /// Normalizes and validates raw caller input.
    ///
    /// # Errors
    /// - `MissingContactFields` when both values are absent after trimming.
    /// - `InvalidEmail` / `InvalidPhoneNumber` on malformed values.
    pub fn new(
        email: Option<impl AsRef<str>>,
        phone_number: Option<impl AsRef<str>>,
    ) -> Result<Self, FragmentError> {
        let email = normalize(email);
        let phone_number = normalize(phone_number);

        if email.is_none() && phone_number.is_none() {
            return Err(FragmentError::MissingContactFields);
        }
        if let Some(value) = email.as_deref() {
            if !EMAIL_RE.is_match(value) {
                return Err(FragmentError::InvalidEmail);
            }
        }
        if let Some(value) = phone_number.as_deref() {
            if !PHONE_RE.is_match(value) {
                return Err(FragmentError::InvalidPhoneNumber);
            }
        }

        Ok(Self {
            email,
            phone_number,
        })
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }
}

fn normalize(value: Option<impl AsRef<str>>) -> Option<String> {
    value
        .map(|raw| raw.as_ref().trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}
