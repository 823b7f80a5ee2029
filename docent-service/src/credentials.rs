//! Credential rules and secrets handling.
//!
//! Username and password policy checks, argon2 password hashing, and
//! minting/digesting of opaque bearer tokens.

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::{ServiceError, ServiceResult, ValidationIssue};

pub const MIN_USERNAME_LENGTH: usize = 4;
pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Symbols that satisfy the "special character" password requirement
pub const PASSWORD_SYMBOLS: &[char] = &['@', '$', '!', '%', '*', '?', '&'];

/// Token length in bytes before hex encoding
const TOKEN_BYTES: usize = 32;

/// Check a candidate username against the format rules.
///
/// Uniqueness is checked separately against the user table.
pub fn validate_username(candidate: &str) -> Result<(), ValidationIssue> {
    let length = candidate.chars().count();

    if length < MIN_USERNAME_LENGTH {
        return Err(ValidationIssue::UsernameTooShort);
    }
    if !candidate
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ValidationIssue::InvalidCharacters);
    }
    if length > MAX_USERNAME_LENGTH {
        return Err(ValidationIssue::TooLong {
            max: MAX_USERNAME_LENGTH,
        });
    }

    Ok(())
}

/// Check a candidate password against the complexity policy: at least one
/// uppercase letter, one lowercase letter, one digit and one of
/// [`PASSWORD_SYMBOLS`], at least [`MIN_PASSWORD_LENGTH`] characters.
///
/// The password must be a single line. One trailing `\n` is tolerated and
/// does not count towards the rules.
pub fn validate_password(candidate: &str) -> Result<(), ValidationIssue> {
    let line = candidate.strip_suffix('\n').unwrap_or(candidate);

    let strong = !line.contains('\n')
        && line.chars().count() >= MIN_PASSWORD_LENGTH
        && line.chars().any(|c| c.is_ascii_uppercase())
        && line.chars().any(|c| c.is_ascii_lowercase())
        && line.chars().any(|c| c.is_ascii_digit())
        && line.chars().any(|c| PASSWORD_SYMBOLS.contains(&c));

    if strong {
        Ok(())
    } else {
        Err(ValidationIssue::WeakPassword)
    }
}

/// Hash a password into an argon2 PHC string with a random salt
pub fn hash_password(password: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::Internal {
            message: format!("Password hashing failed: {}", e),
        })
}

/// Verify a password against a stored PHC string
pub fn verify_password(password: &str, stored_hash: &str) -> ServiceResult<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| ServiceError::Internal {
        message: format!("Stored password hash is malformed: {}", e),
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Mint a new random bearer token (hex encoded)
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    to_hex(&bytes)
}

/// SHA-256 digest of a token, as stored in the sessions table
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
