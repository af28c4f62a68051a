//! Resolved entity model: config validated and flattened for runtime use.

use crate::auth::Requirements;
use crate::config::FieldType;
use crate::schema::Action;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-field constraints checked when a payload is accepted.
#[derive(Clone, Debug, Default)]
pub struct FieldRules {
    pub format: Option<String>,
    pub max_length: Option<u32>,
    pub min_length: Option<u32>,
    pub pattern: Option<Regex>,
    pub allowed: Option<Vec<Value>>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    pub default: Option<Value>,
    pub nullable: bool,
    pub unique: bool,
    /// True only for the field used as the entity's primary key.
    pub primary_key: bool,
    pub auto: bool,
    pub mode: String,
    pub rules: FieldRules,
}

impl FieldDef {
    pub fn in_mode(&self, action: Action) -> bool {
        action.matches(&self.mode)
    }

    /// A create payload must supply this field.
    pub fn required_on_create(&self) -> bool {
        !self.nullable && !self.auto && self.default.is_none()
    }
}

/// Object-graph link: `local_key` on this entity holds the primary key of `entity`.
#[derive(Clone, Debug)]
pub struct Relation {
    pub name: String,
    pub entity: String,
    pub local_key: String,
    pub mode: String,
}

#[derive(Clone, Debug)]
pub struct EntityDef {
    pub name: String,
    pub schema_name: String,
    pub table_name: String,
    pub fields: Vec<FieldDef>,
    pk_index: usize,
    pub relations: Vec<Relation>,
    pub operations: Vec<String>,
    pub auth: Option<Requirements>,
    pub allow_primary_key_update: bool,
    pub comment: Option<String>,
}

impl EntityDef {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        schema_name: String,
        table_name: String,
        fields: Vec<FieldDef>,
        pk_index: usize,
        relations: Vec<Relation>,
        operations: Vec<String>,
        auth: Option<Requirements>,
        allow_primary_key_update: bool,
        comment: Option<String>,
    ) -> Self {
        EntityDef {
            name,
            schema_name,
            table_name,
            fields,
            pk_index,
            relations,
            operations,
            auth,
            allow_primary_key_update,
            comment,
        }
    }

    pub fn primary_key(&self) -> &FieldDef {
        &self.fields[self.pk_index]
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn allows(&self, operation: &str) -> bool {
        self.operations.iter().any(|o| o == operation)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub entities: Vec<Arc<EntityDef>>,
    pub entity_by_name: HashMap<String, Arc<EntityDef>>,
}

impl ResolvedModel {
    pub fn entity(&self, name: &str) -> Option<&Arc<EntityDef>> {
        self.entity_by_name.get(name)
    }
}
