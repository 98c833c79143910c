//! Input checks for the demo's forms.
//!
//! Containers accept any input; callers decide what is acceptable and check
//! it here before calling a mutator.

use log::*;
use regex::Regex;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Errors reported by the validation helpers.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Required field left blank
    #[error("{field} is required")]
    Empty { field: String },

    /// Email address is malformed
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
}

/// Return the trimmed value, or an error naming `field` if it is blank.
///
pub fn require_non_empty<'a>(field: &str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty {
            field: field.to_string(),
        });
    }
    Ok(trimmed)
}

/// Whether `email` looks like `name@domain.tld`.
///
pub fn is_valid_email(email: &str) -> bool {
    match Regex::new(EMAIL_PATTERN) {
        Ok(re) => re.is_match(email.trim()),
        Err(e) => {
            warn!("Failed to compile regex pattern '{}': {}", EMAIL_PATTERN, e);
            false
        }
    }
}

/// Check a name / email pair for a new user.
///
pub fn validate_user<'a>(
    name: &'a str,
    email: &'a str,
) -> Result<(&'a str, &'a str), ValidationError> {
    let name = require_non_empty("Name", name)?;
    let email = require_non_empty("Email", email)?;
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    Ok((name, email))
}
