//! Field filters of list queries.
//!
//! Every list argument that is not a pagination or ordering argument is a
//! filter: `<field>` for an exact match, `<field>_Icontains` for a
//! case-insensitive substring match on text columns. Field names may be
//! written in snake_case or camelCase.

use crate::domain::{Entity, EntityField, EntityKind, FieldType, FieldValue, GlobalId, RecordId};
use crate::error::ServiceError;
use serde_json::{Map, Value};

pub const ICONTAINS_SUFFIX: &str = "_Icontains";

/// List arguments that are never filters.
pub const RESERVED_ARGUMENTS: &[&str] =
    &["first", "last", "after", "before", "order_by", "orderBy"];

/// A filterable, orderable column of an entity: its record id or one of its
/// fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column<F> {
    Id,
    Field(F),
}

impl<F: EntityField> Column<F> {
    /// Parses a column name of an entity of `kind`.
    pub fn parse(kind: EntityKind, name: &str) -> Result<Self, ServiceError> {
        let normalized = snake_case(name.trim());
        if normalized == "id" {
            return Ok(Column::Id);
        }
        normalized
            .parse::<F>()
            .map(Column::Field)
            .map_err(|_| ServiceError::UnknownField {
                kind,
                field: name.to_string(),
            })
    }

    pub fn field_type(self, kind: EntityKind) -> FieldType {
        match self {
            Column::Id => FieldType::Reference(kind),
            Column::Field(field) => field.field_type(),
        }
    }

    pub fn value_of<T: Entity<Field = F>>(self, id: RecordId, value: &T) -> FieldValue {
        match self {
            Column::Id => FieldValue::Reference(GlobalId::new(T::KIND, id)),
            Column::Field(field) => value.field_value(field),
        }
    }
}

/// `cycleDayUpdated` -> `cycle_day_updated`; snake_case passes through.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    Exact(FieldValue),
    /// Needle already lowercased.
    ContainsIgnoreCase(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter<F> {
    pub column: Column<F>,
    pub matcher: Matcher,
}

impl<F: EntityField> Filter<F> {
    pub fn parse<T: Entity<Field = F>>(argument: &str, raw: &Value) -> Result<Self, ServiceError> {
        if let Some(base) = argument.strip_suffix(ICONTAINS_SUFFIX) {
            let column = Column::parse(T::KIND, base)?;
            if column.field_type(T::KIND) != FieldType::Text {
                return Err(ServiceError::invalid_argument(
                    argument,
                    "substring matching applies to text fields only",
                ));
            }
            let needle = raw
                .as_str()
                .ok_or_else(|| ServiceError::invalid_argument(argument, "expected a string"))?;
            return Ok(Self {
                column,
                matcher: Matcher::ContainsIgnoreCase(needle.to_lowercase()),
            });
        }

        let column = Column::parse(T::KIND, argument)?;
        let field_type = column.field_type(T::KIND);
        let value = FieldValue::parse(field_type, raw).ok_or_else(|| {
            ServiceError::invalid_argument(argument, format!("expected a {}", describe(field_type)))
        })?;
        Ok(Self {
            column,
            matcher: Matcher::Exact(value),
        })
    }

    pub fn matches<T: Entity<Field = F>>(&self, id: RecordId, value: &T) -> bool {
        let actual = self.column.value_of(id, value);
        match &self.matcher {
            Matcher::Exact(expected) => actual == *expected,
            Matcher::ContainsIgnoreCase(needle) => actual.contains_ignore_case(needle),
        }
    }
}

fn describe(field_type: FieldType) -> String {
    match field_type {
        FieldType::Text => "string".to_string(),
        FieldType::Integer => "integer".to_string(),
        FieldType::Time => "time of day (HH:MM:SS)".to_string(),
        FieldType::DateTime => "RFC 3339 timestamp".to_string(),
        FieldType::Reference(kind) => format!("{kind} id"),
    }
}

/// Parses every filter argument of a list query.
pub fn parse_filters<T: Entity>(
    arguments: &Map<String, Value>,
) -> Result<Vec<Filter<T::Field>>, ServiceError> {
    arguments
        .iter()
        .filter(|(name, value)| !RESERVED_ARGUMENTS.contains(&name.as_str()) && !value.is_null())
        .map(|(name, value)| Filter::parse::<T>(name, value))
        .collect()
}
