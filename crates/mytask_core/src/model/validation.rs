//! Input validation shared by model constructors and services.
//!
//! # Invariants
//! - Validation runs before any backend call so invalid input never reaches
//!   the network or storage.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());
static E164_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^\+[1-9][0-9]{6,14}$").ok());

fn matches(re: &Lazy<Option<Regex>>, value: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(value))
}

/// Validation failures for user-provided fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    BlankProjectName,
    BlankTaskTitle,
    BlankUserName,
    InvalidEmail(String),
    InvalidPhoneNumber(String),
    PasswordTooShort { min_len: usize },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankProjectName => write!(f, "project name must not be blank"),
            Self::BlankTaskTitle => write!(f, "task title must not be blank"),
            Self::BlankUserName => write!(f, "name must not be blank"),
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
            Self::InvalidPhoneNumber(value) => {
                write!(f, "phone number `{value}` must use international format (+34...)")
            }
            Self::PasswordTooShort { min_len } => {
                write!(f, "password must be at least {min_len} characters")
            }
        }
    }
}

impl Error for ValidationError {}

/// Minimum password length accepted by the identity service.
pub const MIN_PASSWORD_LEN: usize = 6;

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if matches(&EMAIL_RE, email.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min_len: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// Normalizes and validates an E.164 phone number.
///
/// Spaces, dashes and parentheses are stripped before matching.
pub fn normalize_phone_number(value: &str) -> Result<String, ValidationError> {
    let compact: String = value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    if matches(&E164_RE, &compact) {
        Ok(compact)
    } else {
        Err(ValidationError::InvalidPhoneNumber(value.to_string()))
    }
}

/// Masks a phone number for logs, keeping the last four digits.
pub fn mask_phone_number(value: &str) -> String {
    let count = value.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let visible: String = value.chars().skip(count - 4).collect();
    format!("{}{visible}", "*".repeat(count - 4))
}
