//! JSON schemas of operation inputs, served at `GET /schema`.

use crate::domain::{
    Course, Dish, Entity, EntityKind, Event, Meal, MenuItem, Timetable, Vendor, Weekday,
};
use schemars::{JsonSchema, schema_for};
use serde_json::Value;
use std::collections::BTreeMap;

/// Shape of an `updateX` input: the record's global id plus the patched fields.
#[derive(JsonSchema)]
#[allow(dead_code)]
struct UpdateInput<P> {
    id: String,
    #[serde(flatten)]
    patch: P,
}

/// Registry of input schemas keyed by operation name.
#[derive(Debug, Clone, Default)]
pub struct OperationSchemas {
    schemas: BTreeMap<String, Value>,
}

impl OperationSchemas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `createX` and `updateX` schemas for every entity.
    pub fn for_entities() -> Self {
        let mut schemas = Self::new();
        schemas.register_entity::<Weekday>();
        schemas.register_entity::<Meal>();
        schemas.register_entity::<Course>();
        schemas.register_entity::<Dish>();
        schemas.register_entity::<Timetable>();
        schemas.register_entity::<MenuItem>();
        schemas.register_entity::<Vendor>();
        schemas.register_entity::<Event>();
        schemas
    }

    /// Register the schema of `T` under `operation`.
    pub fn register<T: JsonSchema>(&mut self, operation: impl Into<String>) {
        let schema = serde_json::to_value(schema_for!(T)).unwrap_or(Value::Null);
        self.schemas.insert(operation.into(), schema);
    }

    fn register_entity<T: Entity>(&mut self) {
        let kind: EntityKind = T::KIND;
        self.register::<T::Input>(format!("create{kind}"));
        self.register::<UpdateInput<T::Patch>>(format!("update{kind}"));
    }

    pub fn get(&self, operation: &str) -> Option<&Value> {
        self.schemas.get(operation)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.schemas
                .iter()
                .map(|(name, schema)| (name.clone(), schema.clone()))
                .collect(),
        )
    }
}
