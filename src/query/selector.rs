//! Per-entity selector: a descriptor table of filterable fields built once at startup,
//! bound against each request's query string.

use crate::config::{EntityDef, FieldDef};
use crate::error::AppError;
use crate::query::filter::{parse_filter, Filter};
use crate::query::paginator::PAGINATION_PARAMS;
use crate::schema::Action;
use std::collections::HashMap;

/// Query name under which the primary key field is filtered.
pub const PRIMARY_KEY_PARAM: &str = "primary_key";

#[derive(Clone, Debug)]
pub struct SelectorSlot {
    /// Query parameter name.
    pub param: String,
    pub field: FieldDef,
}

#[derive(Clone, Debug)]
pub struct SelectorSchema {
    pub slots: Vec<SelectorSlot>,
}

impl SelectorSchema {
    /// Primary key (as `primary_key`) plus every readable field not shadowed by a pagination parameter.
    pub fn for_entity(entity: &EntityDef) -> Self {
        let mut slots = Vec::with_capacity(entity.fields.len());
        for f in &entity.fields {
            let param = if f.primary_key {
                PRIMARY_KEY_PARAM.to_string()
            } else if f.in_mode(Action::Read) && !PAGINATION_PARAMS.contains(&f.name.as_str()) {
                f.name.clone()
            } else {
                continue;
            };
            slots.push(SelectorSlot { param, field: f.clone() });
        }
        SelectorSchema { slots }
    }
}

/// Filters for one request, ANDed together. Each entry is (column, filter).
#[derive(Clone, Debug, Default)]
pub struct Selector {
    pub filters: Vec<(String, Filter)>,
}

impl Selector {
    pub fn bind(schema: &SelectorSchema, params: &HashMap<String, String>) -> Result<Self, AppError> {
        let mut filters = Vec::new();
        for slot in &schema.slots {
            let Some(raw) = params.get(&slot.param) else { continue };
            let field_type = slot.field.field_type;
            let parsed = parse_filter(raw, |s| {
                field_type
                    .coerce_str(s)
                    .map_err(|e| AppError::Validation(format!("{}: {}", slot.param, e)))
            })?;
            if let Some(filter) = parsed {
                filters.push((slot.field.name.clone(), filter));
            }
        }
        Ok(Selector { filters })
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, EntityBuilder, FieldConfig, FieldType, ModelConfig};
    use crate::query::FilterOp;
    use serde_json::json;

    fn schema() -> SelectorSchema {
        let e = EntityBuilder::new("item")
            .field(FieldConfig::new("id", FieldType::Integer).primary_key().auto())
            .field(FieldConfig::new("name", FieldType::Text))
            .field(FieldConfig::new("price", FieldType::Float))
            .field(FieldConfig::new("secret", FieldType::Text).mode("cu"))
            .field(FieldConfig::new("page", FieldType::Integer))
            .build();
        let model = resolve(&ModelConfig { entities: vec![e] }).unwrap();
        SelectorSchema::for_entity(model.entity("item").unwrap())
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn slots_cover_readable_fields() {
        let schema = schema();
        let names: Vec<&str> = schema.slots.iter().map(|s| s.param.as_str()).collect();
        assert_eq!(names, vec!["primary_key", "name", "price"]);
    }

    #[test]
    fn binds_typed_filters_in_field_order() {
        let sel = Selector::bind(
            &schema(),
            &params(&[("price", "[-]1.5,3"), ("name", "[~]lamp"), ("primary_key", "[*]1,2"), ("other", "x")]),
        )
        .unwrap();
        assert_eq!(sel.filters.len(), 3);
        assert_eq!(sel.filters[0].0, "id");
        assert_eq!(sel.filters[0].1.op, FilterOp::In);
        assert_eq!(sel.filters[1].1.operands, vec![json!("%lamp%")]);
        assert_eq!(sel.filters[2].1.operands, vec![json!(1.5), json!(3.0)]);
    }

    #[test]
    fn empty_values_add_no_constraint() {
        let sel = Selector::bind(&schema(), &params(&[("name", ""), ("price", "[-]2")])).unwrap();
        assert!(sel.is_empty());
    }

    #[test]
    fn bad_operand_is_a_validation_error() {
        let err = Selector::bind(&schema(), &params(&[("primary_key", "abc")])).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
