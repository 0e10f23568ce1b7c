//! Password hashing and complexity rules.
//!
//! Hashes are Argon2id PHC strings with the salt embedded; raw passwords
//! never reach the store. Complexity checks collect every violation instead
//! of stopping at the first so the client can show them all at once.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString},
    Argon2, PasswordVerifier,
};
use std::fmt;

const MIN_LENGTH: usize = 8;
const MAX_LENGTH: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComplexityViolation {
    TooShort,
    TooLong,
    MissingUppercase,
    MissingLowercase,
    MissingDigit,
    DisallowedCharacter,
}

impl fmt::Display for ComplexityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::TooShort => "must be at least 8 characters",
            Self::TooLong => "must be at most 12 characters",
            Self::MissingUppercase => "must contain an uppercase letter",
            Self::MissingLowercase => "must contain a lowercase letter",
            Self::MissingDigit => "must contain a digit",
            Self::DisallowedCharacter => "may only contain letters and digits",
        };
        f.write_str(message)
    }
}

/// Check a candidate password against the league password policy, returning
/// every violation.
#[must_use]
pub fn validate_complexity(password: &str) -> Vec<ComplexityViolation> {
    let mut violations = Vec::new();
    let length = password.chars().count();
    if length < MIN_LENGTH {
        violations.push(ComplexityViolation::TooShort);
    }
    if length > MAX_LENGTH {
        violations.push(ComplexityViolation::TooLong);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        violations.push(ComplexityViolation::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        violations.push(ComplexityViolation::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push(ComplexityViolation::MissingDigit);
    }
    if !password.chars().all(|c| c.is_ascii_alphanumeric()) {
        violations.push(ComplexityViolation::DisallowedCharacter);
    }
    violations
}

/// Render violations as one message for the structured failure body.
#[must_use]
pub fn violations_message(violations: &[ComplexityViolation]) -> String {
    let parts: Vec<String> = violations
        .iter()
        .map(ComplexityViolation::to_string)
        .collect();
    format!("Password {}", parts.join("; "))
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC string. `Ok(false)` means the
/// password is wrong; `Err` means the stored hash is unusable.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|err| anyhow!("stored password hash is malformed: {err}"))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(anyhow!("failed to verify password: {err}")),
    }
}
