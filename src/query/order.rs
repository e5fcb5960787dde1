//! `order_by` parsing and sorting.

use super::filter::Column;
use crate::domain::{Entity, EntityField, EntityKind, FieldValue, RecordId};
use crate::error::ServiceError;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey<F> {
    pub column: Column<F>,
    pub direction: Direction,
}

/// One or more sort keys, e.g. `"-cycle_day,name"`.
///
/// Rows equal on every key fall back to record id, in the direction of the
/// first key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy<F> {
    keys: Vec<SortKey<F>>,
}

impl<F: EntityField> OrderBy<F> {
    pub fn parse(kind: EntityKind, raw: &str) -> Result<Self, ServiceError> {
        let mut keys = Vec::new();
        for part in raw.split(',').map(str::trim) {
            let (direction, name) = match part.strip_prefix('-') {
                Some(name) => (Direction::Descending, name),
                None => (Direction::Ascending, part),
            };
            if name.is_empty() {
                return Err(ServiceError::invalid_argument(
                    "order_by",
                    format!("empty field name in '{raw}'"),
                ));
            }
            keys.push(SortKey {
                column: Column::parse(kind, name)?,
                direction,
            });
        }
        Ok(Self { keys })
    }

    /// Accepts a string or a list of strings.
    pub fn from_argument(kind: EntityKind, raw: &Value) -> Result<Self, ServiceError> {
        match raw {
            Value::String(text) => Self::parse(kind, text),
            Value::Array(items) => {
                let parts = items
                    .iter()
                    .map(|item| {
                        item.as_str().ok_or_else(|| {
                            ServiceError::invalid_argument("order_by", "expected field names")
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Self::parse(kind, &parts.join(","))
            }
            _ => Err(ServiceError::invalid_argument(
                "order_by",
                "expected a field name",
            )),
        }
    }

    pub fn keys(&self) -> &[SortKey<F>] {
        &self.keys
    }

    pub fn sort<'a, T: Entity<Field = F>>(&self, rows: &mut Vec<(RecordId, &'a T)>) {
        let tiebreak = self
            .keys
            .first()
            .map(|key| key.direction)
            .unwrap_or(Direction::Ascending);

        let mut keyed: Vec<(Vec<FieldValue>, RecordId, &'a T)> = rows
            .drain(..)
            .map(|(id, value)| {
                let values = self
                    .keys
                    .iter()
                    .map(|key| key.column.value_of(id, value))
                    .collect();
                (values, id, value)
            })
            .collect();

        keyed.sort_by(|(left, left_id, _), (right, right_id, _)| {
            self.keys
                .iter()
                .zip(left.iter().zip(right.iter()))
                .map(|(key, (l, r))| key.direction.apply(l.cmp(r)))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| tiebreak.apply(left_id.cmp(right_id)))
        });

        rows.extend(keyed.into_iter().map(|(_, id, value)| (id, value)));
    }
}
