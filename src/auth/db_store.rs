//! Token store backed by the `auth_token` table.

use crate::auth::store::{TokenData, TokenStore};
use crate::error::AuthError;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sqlx::{PgPool, Row};

pub const TOKEN_TABLE: &str = "auth_token";

/// Create the token table if missing.
pub async fn ensure_token_table(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS auth_token (
            id BIGSERIAL PRIMARY KEY,
            create_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            token VARCHAR(48) NOT NULL UNIQUE,
            data TEXT NOT NULL
        )"#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// 32 random bytes, URL-safe base64 without padding (43 chars).
pub(crate) fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub(crate) fn is_expired(created: DateTime<Utc>, expire_seconds: i64, now: DateTime<Utc>) -> bool {
    created + Duration::seconds(expire_seconds) < now
}

#[derive(Clone)]
pub struct DbTokenStore {
    pool: PgPool,
    expire_seconds: i64,
}

impl DbTokenStore {
    pub fn new(pool: PgPool, expire_seconds: i64) -> Self {
        DbTokenStore { pool, expire_seconds }
    }
}

#[async_trait]
impl TokenStore for DbTokenStore {
    async fn write_token(&self, data: &TokenData) -> Result<String, AuthError> {
        let token = generate_token();
        let payload = serde_json::to_string(data)?;
        sqlx::query("INSERT INTO auth_token (token, data) VALUES ($1, $2)")
            .bind(&token)
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(token)
    }

    async fn read_token(&self, token: &str) -> Result<Option<TokenData>, AuthError> {
        let row = sqlx::query("SELECT create_time, data FROM auth_token WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(None) };
        let created: DateTime<Utc> = row.try_get("create_time")?;
        if is_expired(created, self.expire_seconds, Utc::now()) {
            tracing::warn!(created = %created, "expired token presented; deleting");
            self.destroy_token(token).await?;
            return Ok(None);
        }
        let data: String = row.try_get("data")?;
        Ok(decode_data(&data))
    }

    async fn destroy_token(&self, token: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM auth_token WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Stored payload, or None (with a warning) when the row holds something unreadable.
fn decode_data(data: &str) -> Option<TokenData> {
    match serde_json::from_str(data) {
        Ok(data) => Some(data),
        Err(e) => {
            tracing::warn!(error = %e, "stored token payload is corrupt; treating token as absent");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_url_safe_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn expiry_is_wall_clock_relative() {
        let now = Utc::now();
        assert!(!is_expired(now - Duration::seconds(10), 60, now));
        assert!(is_expired(now - Duration::seconds(61), 60, now));
    }

    #[test]
    fn corrupt_payload_reads_as_absent() {
        assert_eq!(decode_data("{not json"), None);
        assert_eq!(
            decode_data(r#"{"user_id":7,"username":"ada"}"#),
            Some(TokenData {
                user_id: 7,
                username: "ada".into(),
            })
        );
    }
}
