//! Generic CRUD over one entity. Each call is one transaction.

use crate::config::{EntityDef, FieldType, ResolvedModel};
use crate::error::AppError;
use crate::query::{Paginator, Selector};
use crate::schema::{Action, DerivedSchema, SchemaSet};
use crate::service::hooks::CrudHooks;
use crate::service::update::plan_update;
use crate::service::{Record, RequestContext};
use crate::sql::{count_distinct, delete_by_pk, insert, select_by_pks, select_list, update_by_pk, QueryBuf};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{PgConnection, PgPool, Postgres, Row};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Most items (or primary keys) accepted by one call.
pub const MAX_BATCH: usize = 1000;

#[derive(Clone)]
pub struct CrudEngine {
    pool: PgPool,
    model: Arc<ResolvedModel>,
    entity: Arc<EntityDef>,
    schemas: Arc<SchemaSet>,
    hooks: Arc<dyn CrudHooks>,
}

impl CrudEngine {
    pub fn new(pool: PgPool, model: Arc<ResolvedModel>, entity: Arc<EntityDef>, hooks: Arc<dyn CrudHooks>) -> Self {
        let schemas = Arc::new(SchemaSet::for_entity(&entity));
        CrudEngine {
            pool,
            model,
            entity,
            schemas,
            hooks,
        }
    }

    pub fn entity(&self) -> &EntityDef {
        &self.entity
    }

    pub fn schemas(&self) -> &SchemaSet {
        &self.schemas
    }

    /// Comma-separated primary keys, coerced to the key type; duplicates dropped.
    pub fn parse_primary_keys(&self, raw: &str) -> Result<Vec<Value>, AppError> {
        let pk = self.entity.primary_key();
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if seen.insert(part) {
                let key = pk
                    .field_type
                    .coerce_str(part)
                    .map_err(|e| AppError::Validation(format!("{}: {}", pk.name, e)))?;
                keys.push(key);
            }
        }
        if keys.is_empty() {
            return Err(AppError::BadRequest("no primary key given".into()));
        }
        check_batch(keys.len())?;
        Ok(keys)
    }

    /// Validate every payload, then insert them all; nothing is written if any payload is rejected.
    pub async fn create_items(&self, ctx: &RequestContext, items: &[Value]) -> Result<Vec<Record>, AppError> {
        check_batch(items.len())?;
        let accepted = items
            .iter()
            .map(|item| self.schemas.create.accept(item))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(accepted.len());
        for values in &accepted {
            let q = insert(&self.entity, values);
            let row = fetch_records(&mut *tx, &q, &self.entity).await?.into_iter().next();
            if let Some(row) = row {
                created.push(row);
            }
        }
        self.hooks.on_after_create(ctx, &mut *tx, &created).await?;
        tx.commit().await?;
        tracing::debug!(entity = %self.entity.name, count = created.len(), "created");
        Ok(self.read_projection(&created))
    }

    pub async fn read_item_by_primary_key(&self, key: &Value) -> Result<Record, AppError> {
        let q = select_by_pks(&self.entity, std::slice::from_ref(key), false);
        let row = fetch_records(&self.pool, &q, &self.entity).await?.into_iter().next();
        row.map(|r| self.schemas.read.project(&r))
            .ok_or_else(|| AppError::NotFound(format!("{} {}", self.entity.name, key)))
    }

    /// One page of matching rows, and the total match count or -1 when not requested.
    /// Count and page share one snapshot, so `total` agrees with the returned rows.
    pub async fn read_items(&self, selector: &Selector, paginator: &Paginator) -> Result<(Vec<Record>, i64), AppError> {
        self.check_ordering(paginator)?;
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        let total = if paginator.show_total {
            let q = count_distinct(&self.entity, selector);
            let row = bind_all(&q).fetch_one(&mut *tx).await?;
            row.try_get::<i64, _>(0)?
        } else {
            -1
        };
        let q = select_list(&self.entity, selector, paginator);
        let rows = fetch_records(&mut *tx, &q, &self.entity).await?;
        tx.commit().await?;
        Ok((self.read_projection(&rows), total))
    }

    /// Columns hidden from reads cannot be ordered on; names that are not columns at all
    /// are left for the store to reject.
    fn check_ordering(&self, paginator: &Paginator) -> Result<(), AppError> {
        let pk = &self.entity.primary_key().name;
        let hidden = paginator
            .order_by
            .iter()
            .find(|o| &o.field != pk && self.entity.field(&o.field).is_some() && !self.schemas.read.contains(&o.field));
        match hidden {
            Some(o) => Err(AppError::BadRequest(format!("cannot order by {}", o.field))),
            None => Ok(()),
        }
    }

    /// Apply `payload` to every row whose key is in `keys`. Missing keys are skipped.
    pub async fn update_items(
        &self,
        ctx: &RequestContext,
        keys: &[Value],
        payload: &Value,
    ) -> Result<Vec<Record>, AppError> {
        check_batch(keys.len())?;
        let accepted = self.schemas.update.accept(payload)?;
        let mut tx = self.pool.begin().await?;
        let old = fetch_records(&mut *tx, &select_by_pks(&self.entity, keys, true), &self.entity).await?;
        let mut new = Vec::with_capacity(old.len());
        for row in &old {
            new.push(apply_update(&mut *tx, &self.model, &self.entity, row.clone(), accepted.clone()).await?);
        }
        self.hooks.on_after_update(ctx, &mut *tx, &old, &new).await?;
        tx.commit().await?;
        tracing::debug!(entity = %self.entity.name, count = new.len(), "updated");
        Ok(self.read_projection(&new))
    }

    /// Delete every row whose key is in `keys` and return them. Missing keys are skipped.
    pub async fn delete_items(&self, ctx: &RequestContext, keys: &[Value]) -> Result<Vec<Record>, AppError> {
        check_batch(keys.len())?;
        let pk = &self.entity.primary_key().name;
        let mut tx = self.pool.begin().await?;
        let rows = fetch_records(&mut *tx, &select_by_pks(&self.entity, keys, true), &self.entity).await?;
        self.hooks.on_before_delete(ctx, &mut *tx, &rows).await?;
        for row in &rows {
            let key = row.get(pk).cloned().unwrap_or(Value::Null);
            let q = delete_by_pk(&self.entity, &key);
            bind_all(&q).execute(&mut *tx).await?;
        }
        self.hooks.on_after_delete(ctx, &mut *tx, &rows).await?;
        tx.commit().await?;
        tracing::debug!(entity = %self.entity.name, count = rows.len(), "deleted");
        Ok(self.read_projection(&rows))
    }

    fn read_projection(&self, rows: &[Record]) -> Vec<Record> {
        rows.iter().map(|r| self.schemas.read.project(r)).collect()
    }
}

fn check_batch(len: usize) -> Result<(), AppError> {
    if len > MAX_BATCH {
        return Err(AppError::BadRequest(format!("batch limited to {} items", MAX_BATCH)));
    }
    Ok(())
}

type UpdateFuture<'a> = Pin<Box<dyn Future<Output = Result<Record, AppError>> + Send + 'a>>;

/// Write the planned columns of `current`, then recurse into related rows for nested mappings.
fn apply_update<'a>(
    conn: &'a mut PgConnection,
    model: &'a ResolvedModel,
    entity: &'a EntityDef,
    current: Record,
    accepted: Record,
) -> UpdateFuture<'a> {
    Box::pin(async move {
        let plan = plan_update(entity, &accepted);
        let key = current.get(&entity.primary_key().name).cloned().unwrap_or(Value::Null);
        let row = if plan.sets.is_empty() {
            current
        } else {
            let q = update_by_pk(entity, &key, &plan.sets);
            match fetch_records(&mut *conn, &q, entity).await?.into_iter().next() {
                Some(updated) => updated,
                None => current,
            }
        };
        for nested in &plan.nested {
            let Some(target) = model.entity(&nested.relation.entity) else {
                continue;
            };
            let local = row.get(&nested.relation.local_key).cloned().unwrap_or(Value::Null);
            if local.is_null() {
                tracing::debug!(relation = %nested.relation.name, "no related row to update");
                continue;
            }
            let sub = DerivedSchema::derive(target, Action::Update).accept(&Value::Object(nested.payload.clone()))?;
            let q = select_by_pks(target, &[local], true);
            let related = fetch_records(&mut *conn, &q, target).await?.into_iter().next();
            if let Some(related) = related {
                apply_update(&mut *conn, model, target, related, sub).await?;
            }
        }
        Ok(row)
    })
}

fn bind_all(q: &QueryBuf) -> sqlx::query::Query<'_, Postgres, PgArguments> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    query
}

async fn fetch_records<'c, E>(executor: E, q: &QueryBuf, entity: &EntityDef) -> Result<Vec<Record>, AppError>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let rows = bind_all(q).fetch_all(executor).await?;
    rows.iter().map(|r| row_to_record(r, entity)).collect()
}

fn row_to_record(row: &PgRow, entity: &EntityDef) -> Result<Record, AppError> {
    let mut map = Record::new();
    for f in &entity.fields {
        map.insert(f.name.clone(), cell_to_value(row, &f.name, f.field_type)?);
    }
    Ok(map)
}

/// Decode one column by its declared type; narrower integer and float columns are widened.
fn cell_to_value(row: &PgRow, name: &str, field_type: FieldType) -> Result<Value, sqlx::Error> {
    Ok(match field_type {
        FieldType::Integer => match row.try_get::<Option<i64>, _>(name) {
            Ok(v) => v.map(Value::from),
            Err(_) => match row.try_get::<Option<i32>, _>(name) {
                Ok(v) => v.map(Value::from),
                Err(_) => row.try_get::<Option<i16>, _>(name)?.map(Value::from),
            },
        },
        FieldType::Float => {
            let v = match row.try_get::<Option<f64>, _>(name) {
                Ok(v) => v,
                Err(_) => row.try_get::<Option<f32>, _>(name)?.map(f64::from),
            };
            v.and_then(serde_json::Number::from_f64).map(Value::Number)
        }
        FieldType::Boolean => row.try_get::<Option<bool>, _>(name)?.map(Value::Bool),
        FieldType::Text => row.try_get::<Option<String>, _>(name)?.map(Value::String),
        FieldType::Uuid => row
            .try_get::<Option<uuid::Uuid>, _>(name)?
            .map(|u| Value::String(u.to_string())),
        FieldType::Datetime => match row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
            Ok(v) => v.map(|d| Value::String(d.to_rfc3339())),
            Err(_) => row
                .try_get::<Option<chrono::NaiveDateTime>, _>(name)?
                .map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        },
        FieldType::Date => row
            .try_get::<Option<chrono::NaiveDate>, _>(name)?
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        FieldType::Json => row.try_get::<Option<Value>, _>(name)?,
    }
    .unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, EntityBuilder, FieldConfig, ModelConfig};
    use crate::service::NoHooks;
    use serde_json::json;
    use sqlx::postgres::PgPoolOptions;

    fn engine() -> CrudEngine {
        let e = EntityBuilder::new("item")
            .field(FieldConfig::new("id", FieldType::Integer).primary_key().auto())
            .field(FieldConfig::new("name", FieldType::Text))
            .field(FieldConfig::new("secret", FieldType::Text).mode("cu").nullable())
            .build();
        let model = Arc::new(resolve(&ModelConfig { entities: vec![e] }).unwrap());
        let entity = model.entity("item").unwrap().clone();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        CrudEngine::new(pool, model, entity, Arc::new(NoHooks))
    }

    #[tokio::test]
    async fn primary_keys_are_coerced_and_deduplicated() {
        let engine = engine();
        assert_eq!(engine.parse_primary_keys("1, 2,2,").unwrap(), vec![json!(1), json!(2)]);
        assert!(matches!(engine.parse_primary_keys("x"), Err(AppError::Validation(_))));
        assert!(matches!(engine.parse_primary_keys(" , "), Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn invalid_payload_fails_before_touching_the_store() {
        let engine = engine();
        let ctx = RequestContext::default();
        let err = engine
            .create_items(&ctx, &[json!({ "name": "ok" }), json!({ "id": 3 })])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn oversized_batches_are_rejected() {
        let engine = engine();
        let items = vec![json!({ "name": "x" }); MAX_BATCH + 1];
        let err = engine.create_items(&RequestContext::default(), &items).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn ordering_on_write_only_field_is_rejected() {
        let engine = engine();
        let config = crate::query::PaginatorConfig::default();
        let paginator = Paginator::normalize(&config, None, None, true, &["-secret"]);
        let err = engine.read_items(&Selector::default(), &paginator).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let readable = Paginator::normalize(&config, None, None, true, &["-name", "id", "nickname"]);
        assert!(engine.check_ordering(&readable).is_ok());
    }
}
