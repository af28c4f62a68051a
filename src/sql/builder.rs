//! Builds parameterized SELECT, COUNT, INSERT, UPDATE, DELETE from an entity definition.

use crate::config::{EntityDef, FieldType};
use crate::query::{FilterOp, OrderDirection, Paginator, Selector};
use crate::sql::params::PgBindValue;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from config).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(entity: &EntityDef) -> String {
    format!("{}.{}", quoted(&entity.schema_name), quoted(&entity.table_name))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf::default()
    }

    /// Push a value and return its cast placeholder, e.g. `$3::BIGINT`.
    fn push_param(&mut self, field_type: FieldType, v: &Value) -> String {
        self.params.push(PgBindValue::for_field(field_type, v));
        format!("${}::{}", self.params.len(), field_type.pg_type())
    }
}

/// Every column of the entity, in definition order.
fn select_column_list(entity: &EntityDef) -> String {
    entity
        .fields
        .iter()
        .map(|f| quoted(&f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn column_type(entity: &EntityDef, column: &str) -> FieldType {
    entity.field(column).map(|f| f.field_type).unwrap_or(FieldType::Text)
}

/// ` WHERE a AND b ...` for the selector's filters, or empty.
fn where_clause(q: &mut QueryBuf, entity: &EntityDef, selector: &Selector) -> String {
    let mut parts = Vec::with_capacity(selector.filters.len());
    for (column, filter) in &selector.filters {
        let ty = column_type(entity, column);
        let col = quoted(column);
        let part = match filter.op {
            FilterOp::In | FilterOp::NotIn => {
                let phs: Vec<String> = filter.operands.iter().map(|v| q.push_param(ty, v)).collect();
                format!("{} {} ({})", col, filter.op.sql(), phs.join(", "))
            }
            FilterOp::Between => {
                let lo = q.push_param(ty, &filter.operands[0]);
                let hi = q.push_param(ty, &filter.operands[1]);
                format!("{} BETWEEN {} AND {}", col, lo, hi)
            }
            FilterOp::Like | FilterOp::NotLike => {
                let ph = q.push_param(FieldType::Text, &filter.operands[0]);
                format!("{}::TEXT {} {}", col, filter.op.sql(), ph)
            }
            _ => {
                let ph = q.push_param(ty, &filter.operands[0]);
                format!("{} {} {}", col, filter.op.sql(), ph)
            }
        };
        parts.push(part);
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// Requested ordering with the primary key appended as tie-breaker.
fn order_clause(entity: &EntityDef, paginator: &Paginator) -> String {
    let pk = &entity.primary_key().name;
    let mut parts: Vec<String> = paginator
        .order_by
        .iter()
        .map(|o| {
            let dir = match o.direction {
                OrderDirection::Asc => "ASC",
                OrderDirection::Desc => "DESC",
            };
            format!("{} {}", quoted(&o.field), dir)
        })
        .collect();
    if !paginator.order_by.iter().any(|o| &o.field == pk) {
        parts.push(format!("{} ASC", quoted(pk)));
    }
    format!(" ORDER BY {}", parts.join(", "))
}

/// One page of rows matching the selector.
pub fn select_list(entity: &EntityDef, selector: &Selector, paginator: &Paginator) -> QueryBuf {
    let mut q = QueryBuf::new();
    let filter = where_clause(&mut q, entity, selector);
    q.sql = format!(
        "SELECT {} FROM {}{}{} LIMIT {} OFFSET {}",
        select_column_list(entity),
        qualified_table(entity),
        filter,
        order_clause(entity, paginator),
        paginator.limit(),
        paginator.offset()
    );
    q
}

/// Distinct primary keys matching the selector.
pub fn count_distinct(entity: &EntityDef, selector: &Selector) -> QueryBuf {
    let mut q = QueryBuf::new();
    let filter = where_clause(&mut q, entity, selector);
    q.sql = format!(
        "SELECT COUNT(DISTINCT {}) FROM {}{}",
        quoted(&entity.primary_key().name),
        qualified_table(entity),
        filter
    );
    q
}

/// Rows whose primary key is in `keys`, in key order; `for_update` locks them.
pub fn select_by_pks(entity: &EntityDef, keys: &[Value], for_update: bool) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = entity.primary_key();
    let phs: Vec<String> = keys.iter().map(|k| q.push_param(pk.field_type, k)).collect();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} IN ({}) ORDER BY {} ASC{}",
        select_column_list(entity),
        qualified_table(entity),
        quoted(&pk.name),
        phs.join(", "),
        quoted(&pk.name),
        if for_update { " FOR UPDATE" } else { "" }
    );
    q
}

/// INSERT of the supplied columns; store defaults fill the rest.
pub fn insert(entity: &EntityDef, values: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut phs = Vec::new();
    for f in &entity.fields {
        if let Some(v) = values.get(&f.name) {
            cols.push(quoted(&f.name));
            phs.push(q.push_param(f.field_type, v));
        }
    }
    let table = qualified_table(entity);
    let returning = select_column_list(entity);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            phs.join(", "),
            returning
        )
    };
    q
}

/// UPDATE one row by primary key. `sets` must be non-empty.
pub fn update_by_pk(entity: &EntityDef, key: &Value, sets: &[(String, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let assignments: Vec<String> = sets
        .iter()
        .map(|(col, v)| {
            let ph = q.push_param(column_type(entity, col), v);
            format!("{} = {}", quoted(col), ph)
        })
        .collect();
    let pk = entity.primary_key();
    let key_ph = q.push_param(pk.field_type, key);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        qualified_table(entity),
        assignments.join(", "),
        quoted(&pk.name),
        key_ph,
        select_column_list(entity)
    );
    q
}

pub fn delete_by_pk(entity: &EntityDef, key: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = entity.primary_key();
    let ph = q.push_param(pk.field_type, key);
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        qualified_table(entity),
        quoted(&pk.name),
        ph
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, EntityBuilder, FieldConfig, ModelConfig};
    use crate::query::{Filter, PaginatorConfig};
    use serde_json::json;
    use std::sync::Arc;

    fn item() -> Arc<EntityDef> {
        let e = EntityBuilder::new("item")
            .schema("shop")
            .field(FieldConfig::new("id", FieldType::Integer).primary_key().auto())
            .field(FieldConfig::new("name", FieldType::Text))
            .field(FieldConfig::new("price", FieldType::Float))
            .build();
        resolve(&ModelConfig { entities: vec![e] }).unwrap().entity("item").unwrap().clone()
    }

    #[test]
    fn list_query_binds_filters_and_pages() {
        let entity = item();
        let selector = Selector {
            filters: vec![
                ("name".into(), Filter { op: FilterOp::Like, operands: vec![json!("%la%")] }),
                ("price".into(), Filter { op: FilterOp::Between, operands: vec![json!(1.0), json!(2.5)] }),
                ("id".into(), Filter { op: FilterOp::NotIn, operands: vec![json!(3), json!(4)] }),
            ],
        };
        let paginator = Paginator::normalize(&PaginatorConfig::default(), Some(2), Some(5), true, &["-price"]);
        let q = select_list(&entity, &selector, &paginator);
        assert_eq!(
            q.sql,
            "SELECT \"id\", \"name\", \"price\" FROM \"shop\".\"item\" WHERE \"name\"::TEXT LIKE $1::TEXT \
             AND \"price\" BETWEEN $2::DOUBLE PRECISION AND $3::DOUBLE PRECISION \
             AND \"id\" NOT IN ($4::BIGINT, $5::BIGINT) ORDER BY \"price\" DESC, \"id\" ASC LIMIT 5 OFFSET 5"
        );
        assert_eq!(q.params.len(), 5);
        assert_eq!(q.params[3], PgBindValue::I64(3));
    }

    #[test]
    fn count_uses_distinct_primary_key() {
        let q = count_distinct(&item(), &Selector::default());
        assert_eq!(q.sql, "SELECT COUNT(DISTINCT \"id\") FROM \"shop\".\"item\"");
        assert!(q.params.is_empty());
    }

    #[test]
    fn primary_key_ordering_is_not_repeated() {
        let paginator = Paginator::normalize(&PaginatorConfig::default(), None, None, false, &["-id"]);
        let q = select_list(&item(), &Selector::default(), &paginator);
        assert!(q.sql.contains("ORDER BY \"id\" DESC LIMIT 10 OFFSET 0"));
    }

    #[test]
    fn insert_only_lists_supplied_columns() {
        let values = json!({ "name": "lamp" }).as_object().unwrap().clone();
        let q = insert(&item(), &values);
        assert_eq!(
            q.sql,
            "INSERT INTO \"shop\".\"item\" (\"name\") VALUES ($1::TEXT) RETURNING \"id\", \"name\", \"price\""
        );
        let q = insert(&item(), &Map::new());
        assert!(q.sql.starts_with("INSERT INTO \"shop\".\"item\" DEFAULT VALUES"));
    }

    #[test]
    fn update_binds_key_last() {
        let q = update_by_pk(&item(), &json!(7), &[("price".into(), json!(9.5))]);
        assert_eq!(
            q.sql,
            "UPDATE \"shop\".\"item\" SET \"price\" = $1::DOUBLE PRECISION WHERE \"id\" = $2::BIGINT \
             RETURNING \"id\", \"name\", \"price\""
        );
        assert_eq!(q.params, vec![PgBindValue::F64(9.5), PgBindValue::I64(7)]);
    }

    #[test]
    fn locking_select_and_delete() {
        let q = select_by_pks(&item(), &[json!(1), json!(2)], true);
        assert!(q.sql.ends_with("WHERE \"id\" IN ($1::BIGINT, $2::BIGINT) ORDER BY \"id\" ASC FOR UPDATE"));
        let q = delete_by_pk(&item(), &json!(1));
        assert_eq!(q.sql, "DELETE FROM \"shop\".\"item\" WHERE \"id\" = $1::BIGINT");
    }

    #[test]
    fn identifiers_are_escaped() {
        assert_eq!(quoted("we\"ird"), "\"we\"\"ird\"");
    }
}
