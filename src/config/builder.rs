//! In-code construction of entity configs, equivalent to the JSON entity file.

use crate::auth::Requirements;
use crate::config::{EntityConfig, FieldConfig, FieldType, RelationConfig, ValidationRule};
use serde_json::Value;

impl FieldConfig {
    pub fn new(name: impl Into<String>, type_: FieldType) -> Self {
        FieldConfig {
            name: name.into(),
            type_,
            default: None,
            nullable: false,
            unique: false,
            primary_key: false,
            auto: false,
            mode: "crud".into(),
            validation: ValidationRule::default(),
            comment: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto(mut self) -> Self {
        self.auto = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn mode(mut self, mode: &str) -> Self {
        self.mode = mode.to_string();
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn max_length(mut self, n: u32) -> Self {
        self.validation.max_length = Some(n);
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.validation.pattern = Some(pattern.to_string());
        self
    }
}

pub struct EntityBuilder {
    config: EntityConfig,
}

impl EntityBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        EntityBuilder {
            config: EntityConfig {
                name: name.into(),
                table: None,
                schema: None,
                fields: Vec::new(),
                relations: Vec::new(),
                operations: ["create", "read", "update", "delete"].iter().map(|s| s.to_string()).collect(),
                auth: None,
                allow_primary_key_update: false,
                comment: None,
            },
        }
    }

    pub fn table(mut self, table: &str) -> Self {
        self.config.table = Some(table.to_string());
        self
    }

    pub fn schema(mut self, schema: &str) -> Self {
        self.config.schema = Some(schema.to_string());
        self
    }

    pub fn field(mut self, field: FieldConfig) -> Self {
        self.config.fields.push(field);
        self
    }

    pub fn relation(mut self, name: &str, entity: &str, local_key: &str) -> Self {
        self.config.relations.push(RelationConfig {
            name: name.to_string(),
            entity: entity.to_string(),
            local_key: local_key.to_string(),
            mode: "u".into(),
        });
        self
    }

    pub fn operations(mut self, ops: &[&str]) -> Self {
        self.config.operations = ops.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn auth(mut self, requirements: Requirements) -> Self {
        self.config.auth = Some(requirements);
        self
    }

    pub fn allow_primary_key_update(mut self) -> Self {
        self.config.allow_primary_key_update = true;
        self
    }

    pub fn build(self) -> EntityConfig {
        self.config
    }
}
