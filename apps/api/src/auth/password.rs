//! bcrypt password hashes for admins and parents.

use anyhow::Context;
use subtle::ConstantTimeEq;

use crate::errors::AppError;

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const HASH_COST: u32 = 4;

pub fn hash_password(plain: &str) -> Result<String, AppError> {
    let hash = bcrypt::hash(plain, HASH_COST).context("Failed to hash password")?;
    Ok(hash)
}

/// A malformed stored hash never verifies.
pub fn verify_password(plain: &str, stored: &str) -> bool {
    bcrypt::verify(plain, stored).unwrap_or(false)
}

/// Compares a plaintext password carried over from legacy parent rows.
pub fn legacy_password_matches(plain: &str, legacy: &str) -> bool {
    plain.as_bytes().ct_eq(legacy.as_bytes()).into()
}
