/// Password Hashing and Verification
///
/// One-way bcrypt hashing for stored account secrets.

use bcrypt::{hash, verify};

use crate::error::{AppError, ValidationError};

const HASH_COST: u32 = 10;
/// bcrypt only reads this many bytes of its input
pub const MAX_PASSWORD_LENGTH: usize = 72;

/// Hash a password using bcrypt
///
/// # Errors
/// Returns error if:
/// - Password is empty or longer than 72 bytes
/// - Bcrypt hashing fails
pub fn hash_password(password: &str) -> Result<String, AppError> {
    validate_password(password)?;

    hash(password, HASH_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
///
/// Comparison is delegated to bcrypt, which compares in constant time.
/// Passwords longer than bcrypt's input limit never match: no stored hash
/// was made from one, and bcrypt would otherwise compare only their prefix.
///
/// # Errors
/// Returns error if the stored hash cannot be parsed
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    if password.len() > MAX_PASSWORD_LENGTH {
        return Ok(false);
    }

    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password"));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password", MAX_PASSWORD_LENGTH));
    }

    Ok(())
}
