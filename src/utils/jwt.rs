use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

/// Tokens are minted by the storefront's identity provider; this service
/// only shares the secret and verifies. `generate_token` exists for local
/// development and tests.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub user_id: String,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn from_env() -> AppResult<Self> {
        let secret = std::env::var("SECRET_KEY")
            .map_err(|_| AppError::Internal("SECRET_KEY not set".to_string()))?;
        Ok(Self::new(&secret))
    }

    pub fn generate_token(&self, user_id: &str) -> AppResult<String> {
        let now = Utc::now();
        let expiration = now + Duration::days(30);

        let claims = Claims {
            sub: user_id.to_string(),
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            user_id: user_id.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))
    }

    pub fn extract_user_id(&self, token: &str) -> AppResult<String> {
        let claims = self.verify_token(token)?;
        Ok(claims.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let service = JwtService::new("test-secret");
        let token = service.generate_token("buyer-1").unwrap();
        assert_eq!(service.extract_user_id(&token).unwrap(), "buyer-1");
    }

    #[test]
    fn test_invalid_token_rejected() {
        let service = JwtService::new("test-secret");
        assert!(service.extract_user_id("not-a-token").is_err());

        let other = JwtService::new("other-secret");
        let token = other.generate_token("buyer-1").unwrap();
        assert!(service.extract_user_id(&token).is_err());
    }
}
