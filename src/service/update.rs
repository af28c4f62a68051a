//! Turns an accepted Update payload into column assignments and nested relation updates.

use crate::config::{EntityDef, Relation};
use crate::service::Record;
use serde_json::Value;

/// Update of the row a relation points at.
#[derive(Clone, Debug)]
pub struct NestedUpdate {
    pub relation: Relation,
    pub payload: Record,
}

#[derive(Clone, Debug, Default)]
pub struct UpdatePlan {
    pub sets: Vec<(String, Value)>,
    pub nested: Vec<NestedUpdate>,
}

impl UpdatePlan {
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty() && self.nested.is_empty()
    }
}

/// Fields are overwritten by name. A mapping under a relation name updates the related row;
/// a mapping under a plain column is left untouched so structured values are never clobbered.
/// Keys naming neither are ignored. The primary key is skipped unless the entity allows reassigning it.
pub fn plan_update(entity: &EntityDef, payload: &Record) -> UpdatePlan {
    let mut plan = UpdatePlan::default();
    for (key, value) in payload {
        if let Some(field) = entity.field(key) {
            if field.primary_key && !entity.allow_primary_key_update {
                tracing::debug!(entity = %entity.name, field = %key, "ignoring primary key in update");
                continue;
            }
            if value.is_object() {
                tracing::debug!(entity = %entity.name, field = %key, "ignoring mapping for non-relation field");
                continue;
            }
            plan.sets.push((key.clone(), value.clone()));
        } else if let (Some(relation), Value::Object(nested)) = (entity.relation(key), value) {
            plan.nested.push(NestedUpdate {
                relation: relation.clone(),
                payload: nested.clone(),
            });
        }
    }
    plan
}
