//! CRUD engine over one entity definition, with lifecycle hooks.

mod crud;
mod hooks;
mod update;

pub use crud::{CrudEngine, MAX_BATCH};
pub use hooks::{CrudHooks, NoHooks};
pub use update::{plan_update, NestedUpdate, UpdatePlan};

use crate::auth::AuthUser;
use serde_json::{Map, Value};

/// A stored row as column name to JSON value.
pub type Record = Map<String, Value>;

/// Who is asking; handed to every hook.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub request_id: String,
    pub user: Option<AuthUser>,
}
