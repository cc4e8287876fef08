//! Password hashing with bcrypt

use crate::error::ServiceError;

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| ServiceError::Internal(format!("password hashing failed: {}", e)))
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
