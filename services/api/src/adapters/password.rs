//! services/api/src/adapters/password.rs
//!
//! Password hashing and account input checks shared by the identity adapters.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use callmyshot_core::ports::{PortError, PortResult, Registration};
use tracing::error;

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const EMAIL_TAKEN: &str = "An account with this email already exists";

pub fn hash_password(password: &str) -> PortResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            PortError::AuthFailure("Failed to create the account. Please try again.".to_string())
        })
}

/// `false` for a wrong password and for a stored hash that cannot be parsed.
pub fn verify_password(password: &str, hashed_password: &str) -> bool {
    match PasswordHash::new(hashed_password) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!("Failed to parse password hash: {:?}", e);
            false
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_registration(registration: &Registration) -> PortResult<()> {
    let email = registration.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(PortError::AuthFailure("Please enter a valid email address".to_string()));
    }
    if registration.password.len() < 8 {
        return Err(PortError::AuthFailure(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(email: &str, password: &str) -> Registration {
        Registration {
            email: email.to_string(),
            password: password.to_string(),
            display_name: None,
            avatar_url: None,
        }
    }

    #[test]
    fn hashed_password_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("battery staple", &hash));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn registration_checks() {
        assert!(validate_registration(&registration("a@b.c", "longenough")).is_ok());
        assert!(validate_registration(&registration("nope", "longenough")).is_err());
        assert!(validate_registration(&registration("a@b.c", "short")).is_err());
    }

    #[test]
    fn emails_are_case_insensitive() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
