//! Signed-token store: the token carries its own payload and expiry.

use crate::auth::store::{TokenData, TokenStore};
use crate::error::AuthError;
use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    user_id: i64,
    exp: i64,
}

pub struct JwtTokenStore {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    expire_seconds: i64,
}

impl JwtTokenStore {
    pub fn new(secret: &str, expire_seconds: i64) -> Self {
        Self::with_algorithm(secret, Algorithm::HS256, expire_seconds)
    }

    pub fn with_algorithm(secret: &str, algorithm: Algorithm, expire_seconds: i64) -> Self {
        JwtTokenStore {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            expire_seconds,
        }
    }
}

#[async_trait]
impl TokenStore for JwtTokenStore {
    async fn write_token(&self, data: &TokenData) -> Result<String, AuthError> {
        let claims = Claims {
            sub: data.username.clone(),
            user_id: data.user_id,
            exp: chrono::Utc::now().timestamp() + self.expire_seconds,
        };
        Ok(encode(&Header::new(self.algorithm), &claims, &self.encoding)?)
    }

    async fn read_token(&self, token: &str) -> Result<Option<TokenData>, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(decoded) => Ok(Some(TokenData {
                user_id: decoded.claims.user_id,
                username: decoded.claims.sub,
            })),
            Err(e) => {
                tracing::debug!(error = %e, "rejected signed token");
                Ok(None)
            }
        }
    }

    async fn destroy_token(&self, _token: &str) -> Result<(), AuthError> {
        Err(AuthError::NotSupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> TokenData {
        TokenData {
            user_id: 7,
            username: "ada".into(),
        }
    }

    #[tokio::test]
    async fn issued_token_resolves() {
        let store = JwtTokenStore::new("secret", 60);
        let token = store.write_token(&data()).await.unwrap();
        assert_eq!(store.read_token(&token).await.unwrap(), Some(data()));
    }

    #[tokio::test]
    async fn foreign_or_expired_tokens_are_absent() {
        let store = JwtTokenStore::new("secret", 60);
        let other = JwtTokenStore::new("other-secret", 60);
        let token = other.write_token(&data()).await.unwrap();
        assert_eq!(store.read_token(&token).await.unwrap(), None);
        assert_eq!(store.read_token("not-a-jwt").await.unwrap(), None);

        let expired = JwtTokenStore::new("secret", -120);
        let token = expired.write_token(&data()).await.unwrap();
        assert_eq!(store.read_token(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn destroy_is_not_supported() {
        let store = JwtTokenStore::new("secret", 60);
        assert!(matches!(store.destroy_token("x").await, Err(AuthError::NotSupported)));
    }
}
