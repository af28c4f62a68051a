//! Raw entity config types matching the JSON entity file.

use crate::auth::Requirements;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Semantic type of a field. Drives request coercion, SQL casts and row decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    Float,
    Boolean,
    Text,
    Uuid,
    Datetime,
    Date,
    Json,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: FieldType,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub primary_key: bool,
    /// Value is produced by the database (serial keys, `NOW()` timestamps, random uuids).
    #[serde(default)]
    pub auto: bool,
    /// Which derived schemas include the field: any mix of `c`, `r`, `u`, `d`.
    #[serde(default = "default_field_mode")]
    pub mode: String,
    #[serde(flatten)]
    pub validation: ValidationRule,
    #[serde(default)]
    pub comment: Option<String>,
}

fn default_field_mode() -> String {
    "crud".into()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationConfig {
    pub name: String,
    /// Target entity name.
    pub entity: String,
    /// Column on this entity holding the target's primary key.
    pub local_key: String,
    #[serde(default = "default_relation_mode")]
    pub mode: String,
}

fn default_relation_mode() -> String {
    "u".into()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Route segment and schema name prefix.
    pub name: String,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub relations: Vec<RelationConfig>,
    #[serde(default = "default_operations")]
    pub operations: Vec<String>,
    /// When set, every route of this entity requires an authenticated user meeting these requirements.
    #[serde(default)]
    pub auth: Option<Requirements>,
    #[serde(default)]
    pub allow_primary_key_update: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

fn default_operations() -> Vec<String> {
    ["create", "read", "update", "delete"].iter().map(|s| s.to_string()).collect()
}

/// Top-level entity file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub entities: Vec<EntityConfig>,
}
