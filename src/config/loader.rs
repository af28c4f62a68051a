//! Load entity config from a JSON file and resolve it into the runtime model.

use crate::config::resolved::{EntityDef, FieldDef, FieldRules, Relation, ResolvedModel};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

const DEFAULT_SCHEMA: &str = "public";

/// Build resolved model from config (validates first).
pub fn resolve(config: &ModelConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let mut entities = Vec::with_capacity(config.entities.len());
    let mut entity_by_name = HashMap::new();
    for e in &config.entities {
        let entity = Arc::new(resolve_entity(e)?);
        entity_by_name.insert(e.name.clone(), entity.clone());
        entities.push(entity);
    }

    Ok(ResolvedModel {
        entities,
        entity_by_name,
    })
}

fn resolve_entity(e: &EntityConfig) -> Result<EntityDef, ConfigError> {
    let pk_index = e
        .fields
        .iter()
        .position(|f| f.primary_key)
        .ok_or_else(|| ConfigError::MissingPrimaryKey(e.name.clone()))?;
    let extra_pks: Vec<&str> = e
        .fields
        .iter()
        .skip(pk_index + 1)
        .filter(|f| f.primary_key)
        .map(|f| f.name.as_str())
        .collect();
    if !extra_pks.is_empty() {
        tracing::warn!(
            entity = %e.name,
            primary_key = %e.fields[pk_index].name,
            ignored = ?extra_pks,
            "several primary key fields declared; using the first"
        );
    }

    let mut fields = Vec::with_capacity(e.fields.len());
    for (i, f) in e.fields.iter().enumerate() {
        fields.push(FieldDef {
            name: f.name.clone(),
            field_type: f.type_,
            default: f.default.clone().filter(|v| !v.is_null()),
            nullable: f.nullable,
            unique: f.unique,
            primary_key: i == pk_index,
            auto: f.auto,
            mode: f.mode.clone(),
            rules: resolve_rules(&e.name, f)?,
        });
    }

    let relations = e
        .relations
        .iter()
        .map(|r| Relation {
            name: r.name.clone(),
            entity: r.entity.clone(),
            local_key: r.local_key.clone(),
            mode: r.mode.clone(),
        })
        .collect();

    Ok(EntityDef::new(
        e.name.clone(),
        e.schema.clone().unwrap_or_else(|| DEFAULT_SCHEMA.into()),
        e.table.clone().unwrap_or_else(|| e.name.clone()),
        fields,
        pk_index,
        relations,
        e.operations.clone(),
        e.auth.clone(),
        e.allow_primary_key_update,
        e.comment.clone(),
    ))
}

fn resolve_rules(entity: &str, f: &FieldConfig) -> Result<FieldRules, ConfigError> {
    let pattern = match &f.validation.pattern {
        Some(p) => Some(Regex::new(p).map_err(|e| {
            ConfigError::Validation(format!("invalid pattern for {}.{}: {}", entity, f.name, e))
        })?),
        None => None,
    };
    Ok(FieldRules {
        format: f.validation.format.clone(),
        max_length: f.validation.max_length,
        min_length: f.validation.min_length,
        pattern,
        allowed: f.validation.allowed.clone(),
        minimum: f.validation.minimum,
        maximum: f.validation.maximum,
    })
}

/// Read the entity file: either `{"entities": [...]}` or a bare array of entities.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<ModelConfig, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_model(&raw)
}

pub fn parse_model(raw: &str) -> Result<ModelConfig, ConfigError> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| ConfigError::Load(e.to_string()))?;
    let config = if value.is_array() {
        ModelConfig {
            entities: serde_json::from_value(value).map_err(|e| ConfigError::Load(e.to_string()))?,
        }
    } else {
        serde_json::from_value(value).map_err(|e| ConfigError::Load(e.to_string()))?
    };
    Ok(config)
}
