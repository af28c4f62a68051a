//! Apply the entity model to the database: schemas, tables, then relation foreign keys.
//! Every statement is idempotent so startup can run it unconditionally.

use crate::auth::{ensure_token_table, PgUserStore};
use crate::config::{EntityDef, FieldDef, FieldType, ResolvedModel};
use crate::error::AppError;
use crate::sql::{qualified_table, quoted};
use serde_json::Value;
use sqlx::PgPool;

fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// SQL literal for a configured default, cast to the column type.
fn default_literal(field: &FieldDef, value: &Value) -> String {
    let raw = match (field.field_type, value) {
        (FieldType::Json, v) => literal(&v.to_string()),
        (_, Value::String(s)) => literal(s),
        (_, Value::Bool(b)) => b.to_string().to_uppercase(),
        (_, v) => v.to_string(),
    };
    format!("{}::{}", raw, field.field_type.pg_type())
}

fn column_ddl(field: &FieldDef) -> String {
    let serial = field.auto && field.primary_key && field.field_type == FieldType::Integer;
    let mut def = format!(
        "{} {}",
        quoted(&field.name),
        if serial { "BIGSERIAL" } else { field.field_type.pg_type() }
    );
    if field.primary_key {
        def.push_str(" PRIMARY KEY");
    } else if !field.nullable {
        def.push_str(" NOT NULL");
    }
    if field.unique && !field.primary_key {
        def.push_str(" UNIQUE");
    }
    if let Some(v) = &field.default {
        def.push_str(&format!(" DEFAULT {}", default_literal(field, v)));
    } else if field.auto && !serial {
        match field.field_type {
            FieldType::Datetime => def.push_str(" DEFAULT NOW()"),
            FieldType::Date => def.push_str(" DEFAULT CURRENT_DATE"),
            FieldType::Uuid => def.push_str(" DEFAULT gen_random_uuid()"),
            _ => {}
        }
    }
    def
}

pub fn table_ddl(entity: &EntityDef) -> String {
    let cols: Vec<String> = entity.fields.iter().map(column_ddl).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        qualified_table(entity),
        cols.join(",\n  ")
    )
}

/// (constraint name, ALTER TABLE statement) per relation.
pub fn foreign_key_ddl(entity: &EntityDef, model: &ResolvedModel) -> Vec<(String, String)> {
    entity
        .relations
        .iter()
        .filter_map(|r| {
            let target = model.entity(&r.entity)?;
            let name = format!("fk_{}_{}", entity.table_name, r.local_key);
            let sql = format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                qualified_table(entity),
                quoted(&name),
                quoted(&r.local_key),
                qualified_table(target),
                quoted(&target.primary_key().name)
            );
            Some((name, sql))
        })
        .collect()
}

pub async fn apply_migrations(pool: &PgPool, model: &ResolvedModel) -> Result<(), AppError> {
    let mut schemas: Vec<&str> = model.entities.iter().map(|e| e.schema_name.as_str()).collect();
    schemas.sort_unstable();
    schemas.dedup();
    for s in schemas {
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(s)))
            .execute(pool)
            .await?;
    }

    for e in &model.entities {
        let ddl = table_ddl(e);
        tracing::debug!(sql = %ddl, "migrate");
        sqlx::query(&ddl).execute(pool).await?;
        if let Some(comment) = &e.comment {
            sqlx::query(&format!("COMMENT ON TABLE {} IS {}", qualified_table(e), literal(comment)))
                .execute(pool)
                .await?;
        }
    }

    for e in &model.entities {
        for (name, sql) in foreign_key_ddl(e, model) {
            let exists = sqlx::query("SELECT 1 FROM pg_constraint WHERE conname = $1")
                .bind(&name)
                .fetch_optional(pool)
                .await?
                .is_some();
            if !exists {
                tracing::debug!(sql = %sql, "migrate");
                sqlx::query(&sql).execute(pool).await?;
            }
        }
    }
    tracing::info!(entities = model.entities.len(), "migrations applied");
    Ok(())
}

/// Token and user tables used by the database-backed auth stores.
pub async fn ensure_auth_tables(pool: &PgPool) -> Result<(), AppError> {
    ensure_token_table(pool).await?;
    PgUserStore::new(pool.clone()).ensure_table().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, EntityBuilder, FieldConfig, ModelConfig};
    use serde_json::json;

    fn model() -> ResolvedModel {
        let profile = EntityBuilder::new("profile")
            .field(FieldConfig::new("id", FieldType::Integer).primary_key().auto())
            .field(FieldConfig::new("bio", FieldType::Text).nullable())
            .build();
        let user = EntityBuilder::new("user")
            .table("users")
            .field(FieldConfig::new("id", FieldType::Integer).primary_key().auto())
            .field(FieldConfig::new("name", FieldType::Text).unique())
            .field(FieldConfig::new("active", FieldType::Boolean).default_value(json!(true)))
            .field(FieldConfig::new("created", FieldType::Datetime).auto())
            .field(FieldConfig::new("note", FieldType::Text).default_value(json!("it's")))
            .field(FieldConfig::new("profile_id", FieldType::Integer).nullable())
            .relation("profile", "profile", "profile_id")
            .build();
        resolve(&ModelConfig {
            entities: vec![profile, user],
        })
        .unwrap()
    }

    #[test]
    fn table_ddl_follows_field_attributes() {
        let model = model();
        let ddl = table_ddl(model.entity("user").unwrap());
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS \"public\".\"users\" ("));
        assert!(ddl.contains("\"id\" BIGSERIAL PRIMARY KEY"));
        assert!(ddl.contains("\"name\" TEXT NOT NULL UNIQUE"));
        assert!(ddl.contains("\"active\" BOOLEAN NOT NULL DEFAULT TRUE::BOOLEAN"));
        assert!(ddl.contains("\"created\" TIMESTAMPTZ NOT NULL DEFAULT NOW()"));
        assert!(ddl.contains("\"note\" TEXT NOT NULL DEFAULT 'it''s'::TEXT"));
        assert!(ddl.contains("\"profile_id\" BIGINT,") || ddl.ends_with("\"profile_id\" BIGINT\n)"));
    }

    #[test]
    fn relations_become_foreign_keys() {
        let model = model();
        let fks = foreign_key_ddl(model.entity("user").unwrap(), &model);
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].0, "fk_users_profile_id");
        assert_eq!(
            fks[0].1,
            "ALTER TABLE \"public\".\"users\" ADD CONSTRAINT \"fk_users_profile_id\" FOREIGN KEY (\"profile_id\") \
             REFERENCES \"public\".\"profile\" (\"id\")"
        );
    }
}
