//! Request/response schemas derived from an entity definition by per-field mode.
//!
//! Each field carries a free-text mode; a field belongs to the Create, Read, Update or
//! Delete schema when its lower-cased mode contains that action's initial letter.

mod coerce;
mod validation;

pub use validation::check_rules;

use crate::config::{EntityDef, FieldDef, Relation};
use crate::error::AppError;
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub fn letter(self) -> char {
        match self {
            Action::Create => 'c',
            Action::Read => 'r',
            Action::Update => 'u',
            Action::Delete => 'd',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Action::Create => "Create",
            Action::Read => "Read",
            Action::Update => "Update",
            Action::Delete => "Delete",
        }
    }

    pub fn matches(self, mode: &str) -> bool {
        mode.to_lowercase().contains(self.letter())
    }
}

#[derive(Clone, Debug)]
pub struct DerivedSchema {
    /// e.g. `userRead` for entity `user`.
    pub name: String,
    pub action: Action,
    pub fields: Vec<FieldDef>,
    pub relations: Vec<Relation>,
}

impl DerivedSchema {
    pub fn derive(entity: &EntityDef, action: Action) -> Self {
        DerivedSchema {
            name: format!("{}{}", entity.name, action.label()),
            action,
            fields: entity.fields.iter().filter(|f| f.in_mode(action)).cloned().collect(),
            relations: entity
                .relations
                .iter()
                .filter(|r| action.matches(&r.mode))
                .cloned()
                .collect(),
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.name == field)
    }

    /// Validate and coerce a client payload. Unknown keys are dropped.
    ///
    /// Create fills defaults and requires fields without one; other actions are partial.
    /// Update also keeps object values addressed to relations in its mode.
    pub fn accept(&self, payload: &Value) -> Result<Map<String, Value>, AppError> {
        let obj = payload
            .as_object()
            .ok_or_else(|| AppError::Validation(format!("{} must be a JSON object", self.name)))?;
        let mut out = Map::new();
        for f in &self.fields {
            match obj.get(&f.name) {
                Some(Value::Null) => {
                    if !f.nullable {
                        return Err(AppError::Validation(format!("{} must not be null", f.name)));
                    }
                    out.insert(f.name.clone(), Value::Null);
                }
                Some(v) => {
                    let coerced = f
                        .field_type
                        .coerce_json(v)
                        .map_err(|e| AppError::Validation(format!("{}: {}", f.name, e)))?;
                    check_rules(&f.name, &coerced, &f.rules)?;
                    out.insert(f.name.clone(), coerced);
                }
                None if self.action == Action::Create => {
                    if let Some(default) = &f.default {
                        out.insert(f.name.clone(), default.clone());
                    } else if f.required_on_create() {
                        return Err(AppError::Validation(format!("{} is required", f.name)));
                    }
                }
                None => {}
            }
        }
        if self.action == Action::Update {
            for r in &self.relations {
                match obj.get(&r.name) {
                    Some(v @ Value::Object(_)) => {
                        out.insert(r.name.clone(), v.clone());
                    }
                    Some(_) => {
                        return Err(AppError::Validation(format!("{} must be an object", r.name)));
                    }
                    None => {}
                }
            }
        }
        Ok(out)
    }

    /// Keep only this schema's fields from a stored record.
    pub fn project(&self, record: &Map<String, Value>) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|f| record.get(&f.name).map(|v| (f.name.clone(), v.clone())))
            .collect()
    }
}

/// The four derived schemas of one entity.
#[derive(Clone, Debug)]
pub struct SchemaSet {
    pub create: DerivedSchema,
    pub read: DerivedSchema,
    pub update: DerivedSchema,
    pub delete: DerivedSchema,
}

impl SchemaSet {
    pub fn for_entity(entity: &EntityDef) -> Self {
        SchemaSet {
            create: DerivedSchema::derive(entity, Action::Create),
            read: DerivedSchema::derive(entity, Action::Read),
            update: DerivedSchema::derive(entity, Action::Update),
            delete: DerivedSchema::derive(entity, Action::Delete),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, EntityBuilder, FieldConfig, FieldType, ModelConfig};
    use serde_json::json;
    use std::sync::Arc;

    fn user() -> Arc<EntityDef> {
        let profile = EntityBuilder::new("profile")
            .field(FieldConfig::new("id", FieldType::Integer).primary_key().auto())
            .build();
        let user = EntityBuilder::new("user")
            .field(FieldConfig::new("id", FieldType::Integer).primary_key().auto())
            .field(FieldConfig::new("name", FieldType::Text).max_length(16))
            .field(FieldConfig::new("secret", FieldType::Text).mode("cu"))
            .field(FieldConfig::new("active", FieldType::Boolean).default_value(json!(true)))
            .field(FieldConfig::new("profile_id", FieldType::Integer).nullable())
            .relation("profile", "profile", "profile_id")
            .build();
        let model = resolve(&ModelConfig { entities: vec![user, profile] }).unwrap();
        model.entity("user").unwrap().clone()
    }

    #[test]
    fn mode_filters_schema_fields() {
        let schemas = SchemaSet::for_entity(&user());
        assert_eq!(schemas.read.name, "userRead");
        assert!(schemas.create.contains("secret"));
        assert!(schemas.update.contains("secret"));
        assert!(!schemas.read.contains("secret"));
        assert!(!schemas.delete.contains("secret"));
    }

    #[test]
    fn read_projection_never_exposes_write_only_fields() {
        let schemas = SchemaSet::for_entity(&user());
        let accepted = schemas
            .create
            .accept(&json!({ "name": "ada", "secret": "hunter2", "extra": 1 }))
            .unwrap();
        assert_eq!(accepted["secret"], "hunter2");
        assert!(!accepted.contains_key("extra"));

        let mut stored = accepted.clone();
        stored.insert("id".into(), json!(1));
        let read = schemas.read.project(&stored);
        assert_eq!(read["id"], 1);
        assert_eq!(read["name"], "ada");
        assert!(!read.contains_key("secret"));
    }

    #[test]
    fn create_fills_defaults_and_requires_the_rest() {
        let schemas = SchemaSet::for_entity(&user());
        let accepted = schemas.create.accept(&json!({ "name": "ada", "secret": "x" })).unwrap();
        assert_eq!(accepted["active"], true);
        assert!(!accepted.contains_key("id"));

        let err = schemas.create.accept(&json!({ "secret": "x" })).unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m == "name is required"));
    }

    #[test]
    fn update_is_partial_and_keeps_relation_objects() {
        let schemas = SchemaSet::for_entity(&user());
        let accepted = schemas
            .update
            .accept(&json!({ "name": "bob", "profile": { "bio": "x" }, "nope": 1 }))
            .unwrap();
        assert_eq!(accepted.len(), 2);
        assert_eq!(accepted["profile"], json!({ "bio": "x" }));
        assert!(schemas.update.accept(&json!({ "profile": 3 })).is_err());
    }

    #[test]
    fn constraints_are_enforced() {
        let schemas = SchemaSet::for_entity(&user());
        assert!(schemas.update.accept(&json!({ "name": "a-name-longer-than-sixteen" })).is_err());
        assert!(schemas.update.accept(&json!({ "name": null })).is_err());
        assert!(schemas.update.accept(&json!([1, 2])).is_err());
    }
}
