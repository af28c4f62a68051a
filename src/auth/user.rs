//! Users that tokens resolve to, and password hashing.

use crate::error::AuthError;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    /// bcrypt hash.
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub is_active: bool,
    pub roles: Vec<String>,
    pub groups: Vec<String>,
    pub permissions: Vec<String>,
}

/// A user to register; `password` is plain text and hashed on insert.
#[derive(Clone, Debug, Default)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub groups: Vec<String>,
    pub permissions: Vec<String>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<AuthUser>, AuthError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<AuthUser>, AuthError>;

    async fn create_user(&self, user: NewUser) -> Result<AuthUser, AuthError>;
}

pub async fn hash_password(password: &str) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AuthError::Hashing(format!("task join: {}", e)))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hash = hash.to_string();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::Hashing(format!("task join: {}", e)))?;
    Ok(verified.unwrap_or(false))
}

const USER_COLUMNS: &str = "id, username, password, email, is_active, roles, groups, permissions";

fn user_from_row(row: &PgRow) -> Result<AuthUser, sqlx::Error> {
    Ok(AuthUser {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password: row.try_get("password")?,
        email: row.try_get("email")?,
        is_active: row.try_get("is_active")?,
        roles: row.try_get("roles")?,
        groups: row.try_get("groups")?,
        permissions: row.try_get("permissions")?,
    })
}

/// Users in the `auth_user` table; roles, groups and permissions are `TEXT[]` columns.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        PgUserStore { pool }
    }

    pub async fn ensure_table(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS auth_user (
                id BIGSERIAL PRIMARY KEY,
                username VARCHAR(64) NOT NULL UNIQUE,
                password TEXT NOT NULL,
                email TEXT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                roles TEXT[] NOT NULL DEFAULT '{}',
                groups TEXT[] NOT NULL DEFAULT '{}',
                permissions TEXT[] NOT NULL DEFAULT '{}',
                create_time TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Return a user holding `role`, creating one named after the role if none exists.
    /// The bootstrap password equals the role name and should be changed.
    pub async fn create_role_user(&self, role: &str) -> Result<AuthUser, AuthError> {
        let sql = format!(
            "SELECT {} FROM auth_user WHERE $1 = ANY(roles) ORDER BY id LIMIT 1",
            USER_COLUMNS
        );
        let existing = sqlx::query(&sql).bind(role).fetch_optional(&self.pool).await?;
        if let Some(row) = existing {
            return Ok(user_from_row(&row)?);
        }
        tracing::info!(role = %role, "creating bootstrap user");
        self.create_user(NewUser {
            username: role.to_string(),
            password: role.to_string(),
            email: Some(format!("{}@localhost", role)),
            roles: vec![role.to_string()],
            ..NewUser::default()
        })
        .await
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<AuthUser>, AuthError> {
        let sql = format!("SELECT {} FROM auth_user WHERE username = $1", USER_COLUMNS);
        let row = sqlx::query(&sql).bind(username).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<AuthUser>, AuthError> {
        let sql = format!("SELECT {} FROM auth_user WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn create_user(&self, user: NewUser) -> Result<AuthUser, AuthError> {
        let hashed = hash_password(&user.password).await?;
        let sql = format!(
            "INSERT INTO auth_user (username, password, email, roles, groups, permissions) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&user.username)
            .bind(hashed)
            .bind(&user.email)
            .bind(&user.roles)
            .bind(&user.groups)
            .bind(&user.permissions)
            .fetch_one(&self.pool)
            .await?;
        Ok(user_from_row(&row)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn password_hash_verifies() {
        let hash = hash_password("s3cret").await.unwrap();
        assert!(verify_password("s3cret", &hash).await.unwrap());
        assert!(!verify_password("wrong", &hash).await.unwrap());
        assert!(!verify_password("s3cret", "not-a-hash").await.unwrap());
    }

    #[test]
    fn password_is_never_serialized() {
        let user = AuthUser {
            id: 1,
            username: "ada".into(),
            password: "$2b$...".into(),
            email: None,
            is_active: true,
            roles: vec![],
            groups: vec![],
            permissions: vec![],
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("email").is_none());
        assert_eq!(json["username"], "ada");
    }
}
