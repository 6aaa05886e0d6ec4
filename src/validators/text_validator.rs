use crate::error::{Error, Result};
use crate::models::song::Visibility;

/// Trimmed, non-empty text of at most `max_chars` characters.
pub fn ensure_text(field: &str, value: &str, max_chars: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput {
            reason: format!("{field} must not be empty"),
        });
    }
    ensure_max_len(field, trimmed, max_chars)?;
    Ok(trimmed.to_string())
}

pub fn ensure_max_len(field: &str, value: &str, max_chars: usize) -> Result<()> {
    if value.chars().count() > max_chars {
        return Err(Error::InvalidInput {
            reason: format!("{field} must be at most {max_chars} characters"),
        });
    }
    Ok(())
}

pub fn ensure_optional_max_len(field: &str, value: Option<&str>, max_chars: usize) -> Result<()> {
    match value {
        Some(v) => ensure_max_len(field, v, max_chars),
        None => Ok(()),
    }
}

/// `PUBLIC` / `PRIVATE`, case-insensitive.
pub fn parse_visibility(raw: &str) -> Result<Visibility> {
    match raw.trim().to_uppercase().as_str() {
        "PUBLIC" => Ok(Visibility::Public),
        "PRIVATE" => Ok(Visibility::Private),
        other => Err(Error::InvalidInput {
            reason: format!("visibility must be PUBLIC or PRIVATE, got '{other}'"),
        }),
    }
}
