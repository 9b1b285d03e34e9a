// kab-server/src/services/auth_service.rs

//! Password hashing for registration. The engine only ever sees the resulting hash.

use crate::errors::AppError;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
  Argon2,
};
use tracing::{debug, error, instrument};

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Hashes a plain-text password using Argon2 with default parameters and a random salt.
///
/// Returns `AppError::Validation` for passwords shorter than [`MIN_PASSWORD_LEN`].
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(AppError::Validation(format!(
      "Password must be at least {} characters long.",
      MIN_PASSWORD_LEN
    )));
  }

  let salt = SaltString::generate(&mut OsRng);
  match Argon2::default().hash_password(password.as_bytes(), &salt) {
    Ok(hash) => {
      debug!("Password hashed successfully.");
      Ok(hash.to_string())
    }
    Err(argon_err) => {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      Err(AppError::Internal(format!("Password hashing process failed: {}", argon_err)))
    }
  }
}
