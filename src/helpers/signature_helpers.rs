use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex HMAC-SHA256 of `message`.
pub fn hmac_sha256_hex(key: &str, message: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| Error::HashError(format!("invalid HMAC key: {e}")))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex HMAC-SHA256 signature.
pub fn verify_hmac_sha256_hex(key: &str, message: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(key.as_bytes()) else {
        return false;
    };
    mac.update(message.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let sig = hmac_sha256_hex("Jefe", "what do ya want for nothing?").unwrap();
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify() {
        let sig = hmac_sha256_hex("key", "payload").unwrap();
        assert!(verify_hmac_sha256_hex("key", "payload", &sig));
        assert!(verify_hmac_sha256_hex("key", "payload", &sig.to_uppercase()));
        assert!(!verify_hmac_sha256_hex("key", "payload2", &sig));
        assert!(!verify_hmac_sha256_hex("other", "payload", &sig));
        assert!(!verify_hmac_sha256_hex("key", "payload", "not-hex"));
    }
}
