//! One token store, one transport and one user store composed into login/logout and request gating.

use crate::auth::store::{TokenData, TokenStore};
use crate::auth::transport::Transport;
use crate::auth::user::{verify_password, AuthUser, UserStore};
use crate::auth::Requirements;
use crate::error::{AppError, AuthError};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Clone)]
pub struct Auth {
    tokens: Arc<dyn TokenStore>,
    transport: Arc<dyn Transport>,
    users: Arc<dyn UserStore>,
}

impl Auth {
    pub fn new(tokens: Arc<dyn TokenStore>, transport: Arc<dyn Transport>, users: Arc<dyn UserStore>) -> Self {
        Auth {
            tokens,
            transport,
            users,
        }
    }

    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    /// Check credentials and hand a fresh token to the transport.
    pub async fn login(&self, request_id: &str, form: &LoginForm) -> Result<Response, AppError> {
        let bad_credentials = || AppError::BadRequest("LOGIN_BAD_CREDENTIALS".into());
        let user = self
            .users
            .find_by_username(&form.username)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(bad_credentials)?;
        if !verify_password(&form.password, &user.password).await? {
            return Err(bad_credentials());
        }
        let token = self
            .tokens
            .write_token(&TokenData {
                user_id: user.id,
                username: user.username.clone(),
            })
            .await?;
        tracing::info!(user_id = user.id, "login");
        Ok(self.transport.login_response(request_id, &token))
    }

    /// Revoke the caller's token where the store can; answer 204 where the transport has no logout.
    pub async fn logout(&self, headers: &HeaderMap) -> Result<Response, AppError> {
        let token = self.current_token(headers, &Requirements::none()).await?;
        match self.tokens.destroy_token(&token).await {
            Ok(()) | Err(AuthError::NotSupported) => {}
            Err(e) => return Err(e.into()),
        }
        match self.transport.logout_response() {
            Ok(response) => Ok(response),
            Err(AuthError::LogoutNotSupported) => Ok(StatusCode::NO_CONTENT.into_response()),
            Err(e) => Err(e.into()),
        }
    }

    /// Missing or unresolvable token, unknown or inactive user: 401. Unmet requirements: 403.
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        requirements: &Requirements,
    ) -> Result<(AuthUser, String), AppError> {
        let token = self.transport.extract_token(headers).ok_or(AppError::Unauthorized)?;
        let data = self.tokens.read_token(&token).await?.ok_or(AppError::Unauthorized)?;
        let user = self
            .users
            .find_by_id(data.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AppError::Unauthorized)?;
        if let Some(category) = requirements.unmet_by(&user) {
            return Err(AppError::Forbidden(format!("missing required {}", category)));
        }
        Ok((user, token))
    }

    pub async fn current_user(&self, headers: &HeaderMap, requirements: &Requirements) -> Result<AuthUser, AppError> {
        Ok(self.authenticate(headers, requirements).await?.0)
    }

    pub async fn current_token(&self, headers: &HeaderMap, requirements: &Requirements) -> Result<String, AppError> {
        Ok(self.authenticate(headers, requirements).await?.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::transport::{BearerTransport, CookieTransport};
    use crate::auth::user::{hash_password, NewUser};
    use async_trait::async_trait;
    use axum::http::{header, HeaderValue};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryTokens {
        tokens: Mutex<HashMap<String, TokenData>>,
    }

    #[async_trait]
    impl TokenStore for MemoryTokens {
        async fn write_token(&self, data: &TokenData) -> Result<String, AuthError> {
            let token = format!("t{}", data.user_id);
            self.tokens.lock().unwrap().insert(token.clone(), data.clone());
            Ok(token)
        }

        async fn read_token(&self, token: &str) -> Result<Option<TokenData>, AuthError> {
            Ok(self.tokens.lock().unwrap().get(token).cloned())
        }

        async fn destroy_token(&self, token: &str) -> Result<(), AuthError> {
            self.tokens.lock().unwrap().remove(token);
            Ok(())
        }
    }

    struct MemoryUsers {
        users: Vec<AuthUser>,
    }

    #[async_trait]
    impl UserStore for MemoryUsers {
        async fn find_by_username(&self, username: &str) -> Result<Option<AuthUser>, AuthError> {
            Ok(self.users.iter().find(|u| u.username == username).cloned())
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<AuthUser>, AuthError> {
            Ok(self.users.iter().find(|u| u.id == id).cloned())
        }

        async fn create_user(&self, _user: NewUser) -> Result<AuthUser, AuthError> {
            Err(AuthError::NotSupported)
        }
    }

    async fn user(id: i64, name: &str, active: bool, roles: &[&str]) -> AuthUser {
        AuthUser {
            id,
            username: name.into(),
            password: hash_password("pw").await.unwrap(),
            email: None,
            is_active: active,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            groups: vec![],
            permissions: vec![],
        }
    }

    async fn auth(tokens: Arc<MemoryTokens>) -> Auth {
        let users = MemoryUsers {
            users: vec![user(1, "ada", true, &["admin"]).await, user(2, "bob", false, &[]).await],
        };
        Auth::new(tokens, Arc::new(BearerTransport), Arc::new(users))
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token)).unwrap());
        headers
    }

    #[tokio::test]
    async fn login_issues_token_for_valid_credentials() {
        let tokens = Arc::new(MemoryTokens::default());
        let auth = auth(tokens.clone()).await;
        let form = LoginForm {
            username: "ada".into(),
            password: "pw".into(),
        };
        assert_eq!(auth.login("req-1", &form).await.unwrap().status(), StatusCode::OK);
        assert!(tokens.tokens.lock().unwrap().contains_key("t1"));

        let bad = LoginForm {
            username: "ada".into(),
            password: "nope".into(),
        };
        assert!(matches!(auth.login("req-1", &bad).await, Err(AppError::BadRequest(_))));
        let inactive = LoginForm {
            username: "bob".into(),
            password: "pw".into(),
        };
        assert!(matches!(auth.login("req-1", &inactive).await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn missing_token_and_inactive_user_are_unauthorized() {
        let tokens = Arc::new(MemoryTokens::default());
        let auth = auth(tokens.clone()).await;
        let none = Requirements::none();
        assert!(matches!(auth.current_user(&HeaderMap::new(), &none).await, Err(AppError::Unauthorized)));
        assert!(matches!(auth.current_user(&bearer("unknown"), &none).await, Err(AppError::Unauthorized)));

        let token = tokens
            .write_token(&TokenData {
                user_id: 2,
                username: "bob".into(),
            })
            .await
            .unwrap();
        assert!(matches!(auth.current_user(&bearer(&token), &none).await, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn unmet_requirements_are_forbidden() {
        let tokens = Arc::new(MemoryTokens::default());
        let auth = auth(tokens.clone()).await;
        let token = tokens
            .write_token(&TokenData {
                user_id: 1,
                username: "ada".into(),
            })
            .await
            .unwrap();
        let admin = Requirements::none().roles(&["admin"]);
        assert_eq!(auth.current_user(&bearer(&token), &admin).await.unwrap().username, "ada");
        assert_eq!(auth.current_token(&bearer(&token), &admin).await.unwrap(), token);

        let owner = Requirements::none().roles(&["owner"]);
        assert!(matches!(auth.current_user(&bearer(&token), &owner).await, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn bearer_logout_revokes_and_answers_no_content() {
        let tokens = Arc::new(MemoryTokens::default());
        let auth = auth(tokens.clone()).await;
        let token = tokens
            .write_token(&TokenData {
                user_id: 1,
                username: "ada".into(),
            })
            .await
            .unwrap();
        let response = auth.logout(&bearer(&token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(tokens.tokens.lock().unwrap().is_empty());
        assert!(matches!(auth.logout(&bearer(&token)).await, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn cookie_logout_clears_cookie() {
        let tokens = Arc::new(MemoryTokens::default());
        let users = MemoryUsers {
            users: vec![user(1, "ada", true, &[]).await],
        };
        let auth = Auth::new(
            tokens.clone(),
            Arc::new(CookieTransport::new("auth_token", 60, false)),
            Arc::new(users),
        );
        let token = tokens
            .write_token(&TokenData {
                user_id: 1,
                username: "ada".into(),
            })
            .await
            .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(&format!("auth_token={}", token)).unwrap());
        let response = auth.logout(&headers).await.unwrap();
        assert!(response.headers().contains_key(header::SET_COOKIE));
    }
}
