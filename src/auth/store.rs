use crate::error::AuthError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What a token resolves to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    pub user_id: i64,
    pub username: String,
}

/// Issues, resolves and revokes opaque tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn write_token(&self, data: &TokenData) -> Result<String, AuthError>;

    /// `Ok(None)` for unknown, malformed or expired tokens.
    async fn read_token(&self, token: &str) -> Result<Option<TokenData>, AuthError>;

    /// `AuthError::NotSupported` when tokens cannot be revoked once issued.
    async fn destroy_token(&self, token: &str) -> Result<(), AuthError>;
}
