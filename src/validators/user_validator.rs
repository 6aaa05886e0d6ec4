use lazy_regex::regex_is_match;

use crate::error::{Error, Result};

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 30;

pub fn ensure_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if !regex_is_match!(r"^[^\s@]+@[^\s@]+\.[^\s@]+$", &email) {
        return Err(Error::InvalidInput {
            reason: "Invalid email address".to_string(),
        });
    }
    Ok(email)
}

/// Letters, digits, `_`, `.` and `-`, 3 to 30 characters.
pub fn ensure_username(username: &str) -> Result<String> {
    let username = username.trim();
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len)
        || !regex_is_match!(r"^[A-Za-z0-9_.\-]+$", username)
    {
        return Err(Error::InvalidInput {
            reason: format!(
                "Username must be {MIN_USERNAME_LEN}-{MAX_USERNAME_LEN} characters of letters, digits, '_', '.' or '-'"
            ),
        });
    }
    Ok(username.to_string())
}

/// Record keys as issued by the database: alphanumerics and `_`,
/// optionally prefixed by `table:`.
pub fn ensure_record_id(field: &str, id: &str) -> Result<()> {
    if !regex_is_match!(r"^([a-z_]+:)?[A-Za-z0-9_]{1,64}$", id) {
        return Err(Error::InvalidInput {
            reason: format!("Invalid {field}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert_eq!(ensure_email(" Ana@Example.com ").unwrap(), "ana@example.com");
        assert!(ensure_email("not-an-email").is_err());
        assert!(ensure_email("a@b").is_err());
    }

    #[test]
    fn test_username() {
        assert_eq!(ensure_username("dj_khaled.2").unwrap(), "dj_khaled.2");
        assert!(ensure_username("ab").is_err());
        assert!(ensure_username("has space").is_err());
    }

    #[test]
    fn test_record_id() {
        assert!(ensure_record_id("songId", "song:abc123").is_ok());
        assert!(ensure_record_id("songId", "abc123").is_ok());
        assert!(ensure_record_id("songId", "../etc").is_err());
    }
}
