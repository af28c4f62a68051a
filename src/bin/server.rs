//! Standalone server: entities from `ENTITIES_PATH`, settings from the environment.

use crudplug_sdk::auth::{
    Auth, BearerTransport, CookieTransport, DbTokenStore, JwtTokenStore, PgUserStore, TokenStore, Transport,
};
use crudplug_sdk::config::{AuthSettings, TokenStoreKind, TransportKind};
use crudplug_sdk::extractors::REQUEST_ID_HEADER;
use crudplug_sdk::{app_router, apply_migrations, ensure_auth_tables, load_from_path, resolve, AppState, ConfigError, Settings};
use axum::http::HeaderName;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

const BODY_LIMIT_BYTES: usize = 4 * 1024 * 1024;

fn build_auth(pool: &PgPool, settings: &AuthSettings) -> Result<Auth, ConfigError> {
    let tokens: Arc<dyn TokenStore> = match settings.token_store {
        TokenStoreKind::Database => Arc::new(DbTokenStore::new(pool.clone(), settings.token_expire_seconds)),
        TokenStoreKind::Jwt => {
            let secret = settings
                .jwt_secret
                .as_deref()
                .ok_or_else(|| ConfigError::Validation("AUTH_JWT_SECRET is required for jwt tokens".into()))?;
            Arc::new(JwtTokenStore::new(secret, settings.token_expire_seconds))
        }
    };
    let transport: Arc<dyn Transport> = match settings.transport {
        TransportKind::Bearer => Arc::new(BearerTransport),
        TransportKind::Cookie => Arc::new(CookieTransport::new(
            settings.cookie_name.clone(),
            settings.token_expire_seconds,
            settings.cookie_secure,
        )),
    };
    Ok(Auth::new(tokens, transport, Arc::new(PgUserStore::new(pool.clone()))))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("crudplug_sdk=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await?;

    let config = load_from_path(&settings.entities_path).await?;
    let model = resolve(&config)?;
    apply_migrations(&pool, &model).await?;
    ensure_auth_tables(&pool).await?;

    let auth = Arc::new(build_auth(&pool, &settings.auth)?);
    if let Some(role) = &settings.auth.admin_role {
        let user = PgUserStore::new(pool.clone()).create_role_user(role).await?;
        tracing::info!(username = %user.username, role = %role, "bootstrap user ready");
    }

    let state = AppState::new(pool, model, settings.paginator).with_auth(auth);
    state.check_auth_coverage()?;

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let app = app_router(state, &settings.api_prefix).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(request_id))
            .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES)),
    );

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, prefix = %settings.api_prefix, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
