//! Registration input validation.
//!
//! Every hop runs the same checks, in the same order, on the same payload.
//! The first failing rule decides the [`ValidationError`] category; the
//! attached detail is for internal logs only.

use std::sync::OnceLock;

use regex::Regex;

use crate::core::ssh;
use crate::core::types::RegistrationRequest;
use crate::error::ValidationError;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Minimum number of character classes a password must mix.
pub const MIN_PASSWORD_CLASSES: usize = 3;

/// Characters that count toward the "special" class.
pub const SPECIAL_CHARS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Commonly used passwords rejected regardless of complexity. Compared
/// case-insensitively.
const WEAK_PASSWORDS: &[&str] = &[
    "password",
    "12345678",
    "qwerty12",
    "admin123",
    "password123",
    "letmein12",
    "welcome1",
    "monkey12",
    "dragon12",
    "1234567890",
    "qwertyuiop",
];

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$")
            .unwrap_or_else(|e| panic!("email pattern must compile: {e}"))
    })
}

/// Run every rule against a registration request.
///
/// Order: required fields, email, password, SSH key.
pub fn validate_registration(request: &RegistrationRequest) -> Result<(), ValidationError> {
    validate_required_fields(request)?;

    if !is_valid_email(&request.email) {
        return Err(ValidationError::BadEmail(
            "address does not match the accepted pattern".to_string(),
        ));
    }

    validate_password(&request.password)?;
    validate_ssh_key(&request.ssh_public_key)?;

    Ok(())
}

/// All three fields must be present and non-empty.
pub fn validate_required_fields(request: &RegistrationRequest) -> Result<(), ValidationError> {
    let missing: Vec<&str> = [
        ("email", request.email.is_empty()),
        ("password", request.password.is_empty()),
        ("ssh_public_key", request.ssh_public_key.is_empty()),
    ]
    .into_iter()
    .filter_map(|(name, empty)| empty.then_some(name))
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingField(missing.join(", ")))
    }
}

/// Pattern match plus exactly one `@`.
pub fn is_valid_email(email: &str) -> bool {
    email.matches('@').count() == 1 && email_pattern().is_match(email)
}

/// Length, common-password list, then character-class mix.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(ValidationError::WeakPassword(format!(
            "{} characters, minimum is {}",
            len, MIN_PASSWORD_LEN
        )));
    }

    if is_weak_password(password) {
        return Err(ValidationError::WeakPassword(
            "matches a common password".to_string(),
        ));
    }

    if !has_password_complexity(password) {
        return Err(ValidationError::BadComplexity(format!(
            "{} character classes, minimum is {}",
            password_classes(password),
            MIN_PASSWORD_CLASSES
        )));
    }

    Ok(())
}

/// Case-insensitive membership in the common-password list.
pub fn is_weak_password(password: &str) -> bool {
    let lowered = password.to_lowercase();
    WEAK_PASSWORDS.iter().any(|weak| *weak == lowered)
}

/// At least [`MIN_PASSWORD_CLASSES`] of upper, lower, digit and special.
pub fn has_password_complexity(password: &str) -> bool {
    password_classes(password) >= MIN_PASSWORD_CLASSES
}

fn password_classes(password: &str) -> usize {
    let mut upper = false;
    let mut lower = false;
    let mut digit = false;
    let mut special = false;

    for c in password.chars() {
        if c.is_ascii_uppercase() {
            upper = true;
        } else if c.is_ascii_lowercase() {
            lower = true;
        } else if c.is_ascii_digit() {
            digit = true;
        } else if SPECIAL_CHARS.contains(c) {
            special = true;
        }
    }

    [upper, lower, digit, special].iter().filter(|&&b| b).count()
}

/// Structural check of an authorized-key line.
pub fn validate_ssh_key(key: &str) -> Result<(), ValidationError> {
    ssh::parse_authorized_key(key)
        .map(|_| ())
        .map_err(|e| ValidationError::BadSshKey(e.to_string()))
}
