use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use uuid::Uuid;

use crate::Result;

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub token_duration_min: i64,
    pub jwt_algorithm: Algorithm,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            jwt_secret: env::var("JWT_SECRET")?,
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "music-social-api".to_string()),
            token_duration_min: env::var("TOKEN_DURATION_MIN")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<i64>()
                .unwrap_or(60),
            jwt_algorithm: Algorithm::HS256,
        })
    }
}

/// Identity carried inside the bearer token.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: String,
    pub email: String,
    pub role: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub email: String,
    pub role: String,
    pub username: String,
    pub exp: usize,
    pub iat: usize,
    pub nbf: usize,
    pub iss: String,
    pub aud: String,
    pub jti: String,
}

impl Claims {
    pub fn new(subject: TokenSubject, config: &AuthConfig) -> Self {
        let iat = Utc::now();
        let exp = iat + Duration::minutes(config.token_duration_min);

        Self {
            sub: subject.user_id,
            email: subject.email,
            role: subject.role,
            username: subject.username,
            exp: exp.timestamp() as usize,
            iat: iat.timestamp() as usize,
            nbf: iat.timestamp() as usize,
            iss: config.issuer.clone(),
            aud: config.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

pub struct TokenService;

impl TokenService {
    pub fn create_token(subject: TokenSubject, config: &AuthConfig) -> Result<String> {
        let claims = Claims::new(subject, config);
        let token = encode(
            &Header::new(config.jwt_algorithm),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )?;
        Ok(token)
    }

    pub fn validate_token(token: &str, config: &AuthConfig) -> Result<Claims> {
        let mut validation = Validation::new(config.jwt_algorithm);
        validation.set_audience(&[config.issuer.as_str()]);
        validation.set_issuer(&[config.issuer.as_str()]);

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &validation,
        )?;
        Ok(decoded.claims)
    }
}

#[cfg(test)]
pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "test-secret".to_string(),
        issuer: "music-social-api-test".to_string(),
        token_duration_min: 5,
        jwt_algorithm: Algorithm::HS256,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: "abc123".to_string(),
            email: "ana@example.com".to_string(),
            role: "USER".to_string(),
            username: "ana".to_string(),
        }
    }

    #[test]
    fn test_token_round_trip_keeps_identity() {
        let config = test_auth_config();
        let token = TokenService::create_token(subject(), &config).unwrap();
        let claims = TokenService::validate_token(&token, &config).unwrap();

        assert_eq!(claims.sub, "abc123");
        assert_eq!(claims.email, "ana@example.com");
        assert_eq!(claims.role, "USER");
        assert_eq!(claims.username, "ana");
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let config = test_auth_config();
        let token = TokenService::create_token(subject(), &config).unwrap();

        let other = AuthConfig {
            jwt_secret: "another-secret".to_string(),
            ..test_auth_config()
        };
        assert!(TokenService::validate_token(&token, &other).is_err());
    }
}
