//! Config validation: referential integrity and entity consistency.

use crate::config::{EntityConfig, ModelConfig};
use crate::error::ConfigError;
use std::collections::HashSet;

const OPERATIONS: &[&str] = &["create", "read", "update", "delete"];

pub fn validate(config: &ModelConfig) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for e in &config.entities {
        if e.name.trim().is_empty() {
            return Err(ConfigError::Validation("entity name must not be empty".into()));
        }
        if e.name.contains('/') {
            return Err(ConfigError::Validation(format!("entity name '{}' must be a single path segment", e.name)));
        }
        if !names.insert(e.name.as_str()) {
            return Err(ConfigError::DuplicateEntity(e.name.clone()));
        }
        validate_entity(e)?;
    }

    for e in &config.entities {
        for r in &e.relations {
            if !names.contains(r.entity.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "entity",
                    id: r.entity.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_entity(e: &EntityConfig) -> Result<(), ConfigError> {
    let mut fields = HashSet::new();
    for f in &e.fields {
        if f.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!("entity '{}' has a field without a name", e.name)));
        }
        if !fields.insert(f.name.as_str()) {
            return Err(ConfigError::DuplicateField {
                entity: e.name.clone(),
                field: f.name.clone(),
            });
        }
    }
    if !e.fields.iter().any(|f| f.primary_key) {
        return Err(ConfigError::MissingPrimaryKey(e.name.clone()));
    }
    for op in &e.operations {
        if !OPERATIONS.contains(&op.as_str()) {
            return Err(ConfigError::Validation(format!("entity '{}' has unknown operation '{}'", e.name, op)));
        }
    }
    for r in &e.relations {
        if !fields.contains(r.local_key.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "relation local_key",
                id: format!("{}.{}", e.name, r.local_key),
            });
        }
        if fields.contains(r.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "relation '{}.{}' shadows a field of the same name",
                e.name, r.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EntityBuilder, FieldConfig, FieldType};

    fn user() -> EntityConfig {
        EntityBuilder::new("user")
            .field(FieldConfig::new("id", FieldType::Integer).primary_key().auto())
            .field(FieldConfig::new("name", FieldType::Text))
            .build()
    }

    #[test]
    fn missing_primary_key_is_rejected() {
        let e = EntityBuilder::new("note").field(FieldConfig::new("body", FieldType::Text)).build();
        let err = validate(&ModelConfig { entities: vec![e] }).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPrimaryKey(name) if name == "note"));
    }

    #[test]
    fn duplicate_entities_are_rejected() {
        let err = validate(&ModelConfig { entities: vec![user(), user()] }).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateEntity(_)));
    }

    #[test]
    fn relation_target_must_exist() {
        let e = EntityBuilder::new("post")
            .field(FieldConfig::new("id", FieldType::Integer).primary_key())
            .field(FieldConfig::new("author_id", FieldType::Integer))
            .relation("author", "user", "author_id")
            .build();
        let err = validate(&ModelConfig { entities: vec![e] }).unwrap_err();
        assert!(matches!(err, ConfigError::MissingReference { kind: "entity", .. }));
    }

    #[test]
    fn relation_may_not_shadow_field() {
        let e = EntityBuilder::new("user")
            .field(FieldConfig::new("id", FieldType::Integer).primary_key())
            .field(FieldConfig::new("profile", FieldType::Integer))
            .relation("profile", "user", "profile")
            .build();
        assert!(validate(&ModelConfig { entities: vec![e] }).is_err());
    }
}
