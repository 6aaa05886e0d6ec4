use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{Error, Result};

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn hash_password(password: &str) -> Result<String> {
    Ok(hash(password, DEFAULT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    Ok(verify(password, hash)?)
}

pub fn ensure_password_policy(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::InvalidInput {
            reason: format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hashed = hash_password("secret42").unwrap();
        assert!(verify_password("secret42", &hashed).unwrap());
        assert!(!verify_password("secret43", &hashed).unwrap());
    }

    #[test]
    fn test_password_policy() {
        assert!(ensure_password_policy("12345").is_err());
        assert!(ensure_password_policy("123456").is_ok());
    }
}
