//! Domain model: the stored entity types and the traits the store, query and
//! mutation layers use to handle them generically.
//!
//! ```text
//! +------------------+      +------------------+      +------------------+
//! |  value_objects   |      |    entities      |      |    schedule      |
//! |  RecordId        |<-----|  Weekday  Meal   |----->|  cycle day       |
//! |  GlobalId        |      |  Course   Dish   |      |  arithmetic      |
//! |  Cursor          |      |  Timetable ...   |      |                  |
//! +------------------+      +------------------+      +------------------+
//! ```
//!
//! Each entity implements [`Entity`], which ties together its field enum,
//! its create input and update patch, its storage constraints and the table
//! holding it.

pub mod entities;
pub mod schedule;
pub mod value_objects;

pub use entities::*;
pub use value_objects::*;

use crate::store::{Table, Tables};
use crate::validation::Validate;
use chrono::{DateTime, NaiveTime, Utc};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A stored entity type.
pub trait Entity:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Validate + Send + Sync + 'static
{
    const KIND: EntityKind;

    /// Filterable and orderable columns, excluding the record id.
    type Field: EntityField;
    /// Fields accepted by `createX`.
    type Input: DeserializeOwned + JsonSchema;
    /// Fields accepted by `updateX`; every field optional.
    type Patch: DeserializeOwned + JsonSchema;

    fn from_input(input: Self::Input) -> Self;

    fn apply(&mut self, patch: Self::Patch);

    fn field_value(&self, field: Self::Field) -> FieldValue;

    /// Storage-level unique constraints this record participates in.
    fn unique_keys(&self) -> Vec<UniqueKey>;

    /// Records this one points at.
    fn references(&self) -> Vec<GlobalId> {
        Vec::new()
    }

    fn table(tables: &Tables) -> &Table<Self>;

    fn table_mut(tables: &mut Tables) -> &mut Table<Self>;
}

/// Column enum of an entity, parsed from snake_case names.
pub trait EntityField:
    Copy + Eq + fmt::Debug + fmt::Display + FromStr + Send + Sync + 'static
{
    fn field_type(self) -> FieldType;
}

/// Storage type of a column; decides how filter arguments are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    Time,
    DateTime,
    Reference(EntityKind),
}

/// A single column value, comparable within one column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
    Time(NaiveTime),
    DateTime(DateTime<Utc>),
    Reference(GlobalId),
}

impl FieldValue {
    /// Parses a JSON argument as a value of `field_type`.
    pub fn parse(field_type: FieldType, raw: &Value) -> Option<Self> {
        match (field_type, raw) {
            (FieldType::Text, Value::String(text)) => Some(FieldValue::Text(text.clone())),
            (FieldType::Integer, Value::Number(number)) => number.as_i64().map(FieldValue::Integer),
            (FieldType::Integer, Value::String(text)) => {
                text.trim().parse().ok().map(FieldValue::Integer)
            }
            (FieldType::Time, Value::String(text)) => parse_time(text).map(FieldValue::Time),
            (FieldType::DateTime, Value::String(text)) => DateTime::parse_from_rfc3339(text.trim())
                .ok()
                .map(|parsed| FieldValue::DateTime(parsed.with_timezone(&Utc))),
            (FieldType::Reference(kind), Value::String(text)) => GlobalId::decode(text)
                .filter(|global| global.kind() == kind)
                .map(FieldValue::Reference),
            _ => None,
        }
    }

    /// Case-insensitive substring match; only text values can match.
    pub fn contains_ignore_case(&self, needle_lowercase: &str) -> bool {
        match self {
            FieldValue::Text(text) => text.to_lowercase().contains(needle_lowercase),
            _ => false,
        }
    }
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
}

/// One storage-level unique constraint: the named tuple of values must not
/// repeat within a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueKey {
    pub constraint: &'static str,
    pub values: Vec<FieldValue>,
}

impl UniqueKey {
    pub fn new(constraint: &'static str, values: Vec<FieldValue>) -> Self {
        Self { constraint, values }
    }

    pub fn text(constraint: &'static str, value: &str) -> Self {
        Self::new(constraint, vec![FieldValue::Text(value.to_string())])
    }
}

/// A stored entity together with its primary key.
///
/// Serializes as a graph node: `id` (global), `originalId` (record id), then
/// the entity's own fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    pub id: RecordId,
    pub value: T,
}

impl<T: Entity> Record<T> {
    pub fn new(id: RecordId, value: T) -> Self {
        Self { id, value }
    }

    pub fn global_id(&self) -> GlobalId {
        GlobalId::new(T::KIND, self.id)
    }
}

impl<T: Entity> Serialize for Record<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Node<'a, T> {
            id: GlobalId,
            original_id: RecordId,
            #[serde(flatten)]
            fields: &'a T,
        }

        Node {
            id: self.global_id(),
            original_id: self.id,
            fields: &self.value,
        }
        .serialize(serializer)
    }
}
