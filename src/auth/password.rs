//! Password policy and Argon2 storage format.
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password must be at least {MIN_PASSWORD_LEN} characters")]
    TooShort,

    /// Hashing failed, or a stored hash is not a PHC string.
    #[error("argon2: {0}")]
    Argon2(String),
}

impl From<password_hash::Error> for PasswordError {
    fn from(e: password_hash::Error) -> Self {
        error!(error = %e, "argon2 failure");
        PasswordError::Argon2(e.to_string())
    }
}

/// Length is counted in characters, not bytes.
pub fn check_strength(plain: &str) -> Result<(), PasswordError> {
    if plain.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(PasswordError::TooShort);
    }
    Ok(())
}

/// Checks the policy, then returns a salted Argon2 hash in PHC string form.
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    check_strength(plain)?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(plain.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// `Ok(false)` on mismatch. The policy is not applied here so accounts
/// created under an older one can still log in.
pub fn verify_password(plain: &str, stored: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored)?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
