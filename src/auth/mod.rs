//! Token authentication: pluggable token stores and transports composed by [`Auth`].

mod db_store;
mod facade;
mod jwt_store;
mod middleware;
mod store;
mod transport;
mod user;

pub use db_store::{ensure_token_table, DbTokenStore};
pub use facade::{Auth, LoginForm};
pub use jwt_store::JwtTokenStore;
pub use middleware::{require_auth, CurrentUser};
pub use store::{TokenData, TokenStore};
pub use transport::{BearerTransport, CookieTransport, Transport};
pub use user::{hash_password, verify_password, AuthUser, NewUser, PgUserStore, UserStore};

use serde::{Deserialize, Serialize};

/// Access requirements; every non-empty category must be fully held by the user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Requirements {
    pub fn none() -> Self {
        Requirements::default()
    }

    pub fn roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn groups(mut self, groups: &[&str]) -> Self {
        self.groups = groups.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = permissions.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Name of the first category the user does not satisfy, if any.
    pub fn unmet_by(&self, user: &AuthUser) -> Option<&'static str> {
        let holds = |required: &[String], held: &[String]| required.iter().all(|r| held.contains(r));
        if !holds(&self.roles, &user.roles) {
            Some("roles")
        } else if !holds(&self.groups, &user.groups) {
            Some("groups")
        } else if !holds(&self.permissions, &user.permissions) {
            Some("permissions")
        } else {
            None
        }
    }
}
