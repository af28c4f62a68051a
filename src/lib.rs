//! Crudplug SDK: declarative entity definitions served as CRUD REST endpoints over PostgreSQL,
//! with pluggable token authentication.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod query;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;

pub use auth::{Auth, Requirements};
pub use config::{load_from_path, parse_model, resolve, EntityBuilder, FieldConfig, FieldType, ModelConfig, ResolvedModel, Settings};
pub use error::{AppError, AuthError, ConfigError};
pub use migration::{apply_migrations, ensure_auth_tables};
pub use response::{success_created, success_ok, Envelope, ItemsData};
pub use routes::{app_router, auth_routes, common_routes, entity_routes};
pub use service::{CrudEngine, CrudHooks, NoHooks, RequestContext};
pub use state::AppState;
