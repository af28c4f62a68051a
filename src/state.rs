//! Shared application state for all routes. Engines and selector tables are built once per entity.

use crate::auth::Auth;
use crate::config::ResolvedModel;
use crate::error::{AppError, ConfigError};
use crate::query::{PaginatorConfig, SelectorSchema};
use crate::service::{CrudEngine, CrudHooks, NoHooks};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;

/// Everything a request needs to serve one entity.
#[derive(Clone)]
pub struct EntityRuntime {
    pub engine: CrudEngine,
    pub selector: SelectorSchema,
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub model: Arc<ResolvedModel>,
    pub paginator: PaginatorConfig,
    pub auth: Option<Arc<Auth>>,
    entities: Arc<HashMap<String, EntityRuntime>>,
}

impl AppState {
    pub fn new(pool: PgPool, model: ResolvedModel, paginator: PaginatorConfig) -> Self {
        let model = Arc::new(model);
        let entities = model
            .entities
            .iter()
            .map(|e| {
                let runtime = EntityRuntime {
                    engine: CrudEngine::new(pool.clone(), model.clone(), e.clone(), Arc::new(NoHooks)),
                    selector: SelectorSchema::for_entity(e),
                };
                (e.name.clone(), runtime)
            })
            .collect();
        AppState {
            pool,
            model,
            paginator,
            auth: None,
            entities: Arc::new(entities),
        }
    }

    pub fn with_auth(mut self, auth: Arc<Auth>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Replace the lifecycle hooks of one entity.
    pub fn with_hooks(mut self, entity: &str, hooks: Arc<dyn CrudHooks>) -> Result<Self, ConfigError> {
        let def = self
            .model
            .entity(entity)
            .cloned()
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "entity",
                id: entity.to_string(),
            })?;
        let engine = CrudEngine::new(self.pool.clone(), self.model.clone(), def, hooks);
        if let Some(runtime) = Arc::make_mut(&mut self.entities).get_mut(entity) {
            runtime.engine = engine;
        }
        Ok(self)
    }

    pub fn entity(&self, name: &str) -> Result<&EntityRuntime, AppError> {
        self.entities
            .get(name)
            .ok_or_else(|| AppError::NotFound(format!("entity {}", name)))
    }

    /// Entities that name access requirements need an auth facade.
    pub fn check_auth_coverage(&self) -> Result<(), ConfigError> {
        if self.auth.is_some() {
            return Ok(());
        }
        match self.model.entities.iter().find(|e| e.auth.is_some()) {
            Some(e) => Err(ConfigError::Validation(format!(
                "entity '{}' declares auth requirements but no auth is configured",
                e.name
            ))),
            None => Ok(()),
        }
    }
}
