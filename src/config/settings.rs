//! Runtime settings from environment variables (a `.env` file is loaded by the binary).

use crate::error::ConfigError;
use crate::query::PaginatorConfig;
use std::str::FromStr;

/// Three days, the default token lifetime.
pub const DEFAULT_TOKEN_EXPIRE_SECONDS: i64 = 60 * 60 * 24 * 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenStoreKind {
    Database,
    Jwt,
}

impl FromStr for TokenStoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "db" | "database" => Ok(TokenStoreKind::Database),
            "jwt" => Ok(TokenStoreKind::Jwt),
            _ => Err(ConfigError::Validation(format!(
                "invalid AUTH_TOKEN_STORE: {} (expected db or jwt)",
                s
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportKind {
    Bearer,
    Cookie,
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bearer" => Ok(TransportKind::Bearer),
            "cookie" => Ok(TransportKind::Cookie),
            _ => Err(ConfigError::Validation(format!(
                "invalid AUTH_TRANSPORT: {} (expected bearer or cookie)",
                s
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthSettings {
    pub token_store: TokenStoreKind,
    pub jwt_secret: Option<String>,
    pub token_expire_seconds: i64,
    pub transport: TransportKind,
    pub cookie_name: String,
    pub cookie_secure: bool,
    /// Role whose bootstrap user is created at startup, if any.
    pub admin_role: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: String,
    pub api_prefix: String,
    pub entities_path: String,
    pub paginator: PaginatorConfig,
    pub auth: AuthSettings,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string());

        let token_store: TokenStoreKind = get("AUTH_TOKEN_STORE", "db").parse()?;
        let jwt_secret = lookup("AUTH_JWT_SECRET").filter(|v| !v.is_empty());
        if token_store == TokenStoreKind::Jwt && jwt_secret.is_none() {
            return Err(ConfigError::Validation("AUTH_JWT_SECRET is required when AUTH_TOKEN_STORE=jwt".into()));
        }

        let paginator = PaginatorConfig {
            page_size_default: parse_num("PAGE_SIZE_DEFAULT", &get("PAGE_SIZE_DEFAULT", "10"))?,
            page_size_max: parse_num("PAGE_SIZE_MAX", &get("PAGE_SIZE_MAX", "100"))?,
        };
        if paginator.page_size_default == 0 || paginator.page_size_default > paginator.page_size_max {
            return Err(ConfigError::Validation(
                "PAGE_SIZE_DEFAULT must be between 1 and PAGE_SIZE_MAX".into(),
            ));
        }

        Ok(Settings {
            database_url: get("DATABASE_URL", "postgres://localhost/crudplug"),
            max_connections: parse_num("DATABASE_MAX_CONNECTIONS", &get("DATABASE_MAX_CONNECTIONS", "5"))?,
            bind_addr: get("BIND_ADDR", "0.0.0.0:3000"),
            api_prefix: get("API_PREFIX", "/api/v1"),
            entities_path: get("ENTITIES_PATH", "entities.json"),
            paginator,
            auth: AuthSettings {
                token_store,
                jwt_secret,
                token_expire_seconds: parse_num(
                    "AUTH_TOKEN_EXPIRE_SECONDS",
                    &get("AUTH_TOKEN_EXPIRE_SECONDS", &DEFAULT_TOKEN_EXPIRE_SECONDS.to_string()),
                )?,
                transport: get("AUTH_TRANSPORT", "bearer").parse()?,
                cookie_name: get("AUTH_COOKIE_NAME", "auth_token"),
                cookie_secure: parse_bool("AUTH_COOKIE_SECURE", &get("AUTH_COOKIE_SECURE", "true"))?,
                admin_role: lookup("AUTH_ADMIN_ROLE").filter(|v| !v.is_empty()),
            },
        })
    }
}

fn parse_num<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Validation(format!("{} must be a number, got '{}'", key, raw)))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Validation(format!("{} must be a boolean, got '{}'", key, raw))),
    }
}
