//! Named operations and the `{data, errors}` response envelope.
//!
//! Operation names follow the entity names: `dish` and `dishes` read,
//! `createDish`, `updateDish` and `deleteDish` write. `cycleDay` and
//! `menuForDate` are the schedule queries.

use crate::domain::{
    Course, Dish, EntityKind, Event, Meal, MenuItem, Timetable, Vendor, Weekday,
};
use crate::error::{ErrorPayload, ServiceError};
use crate::{logging, mutation, query};
use crate::store::Store;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::IntoEnumIterator;

/// Runs `$body` with `$T` bound to the entity type of `$kind`.
macro_rules! with_entity {
    ($kind:expr, $T:ident => $body:expr) => {
        match $kind {
            EntityKind::Weekday => {
                type $T = Weekday;
                $body
            }
            EntityKind::Meal => {
                type $T = Meal;
                $body
            }
            EntityKind::Course => {
                type $T = Course;
                $body
            }
            EntityKind::Dish => {
                type $T = Dish;
                $body
            }
            EntityKind::Timetable => {
                type $T = Timetable;
                $body
            }
            EntityKind::MenuItem => {
                type $T = MenuItem;
                $body
            }
            EntityKind::Vendor => {
                type $T = Vendor;
                $body
            }
            EntityKind::Event => {
                type $T = Event;
                $body
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Node(EntityKind),
    Collection(EntityKind),
    Create(EntityKind),
    Update(EntityKind),
    Delete(EntityKind),
    CycleDay,
    MenuForDate,
}

impl Operation {
    pub fn parse(name: &str) -> Result<Self, ServiceError> {
        match name {
            "cycleDay" => return Ok(Operation::CycleDay),
            "menuForDate" => return Ok(Operation::MenuForDate),
            _ => {}
        }
        EntityKind::iter()
            .find_map(|kind| {
                let kind_name: &'static str = kind.into();
                if name == kind.singular() {
                    Some(Operation::Node(kind))
                } else if name == kind.plural() {
                    Some(Operation::Collection(kind))
                } else if name.strip_prefix("create") == Some(kind_name) {
                    Some(Operation::Create(kind))
                } else if name.strip_prefix("update") == Some(kind_name) {
                    Some(Operation::Update(kind))
                } else if name.strip_prefix("delete") == Some(kind_name) {
                    Some(Operation::Delete(kind))
                } else {
                    None
                }
            })
            .ok_or_else(|| ServiceError::UnknownOperation(name.to_string()))
    }

    pub fn name(&self) -> String {
        match self {
            Operation::Node(kind) => kind.singular().to_string(),
            Operation::Collection(kind) => kind.plural().to_string(),
            Operation::Create(kind) => format!("create{kind}"),
            Operation::Update(kind) => format!("update{kind}"),
            Operation::Delete(kind) => format!("delete{kind}"),
            Operation::CycleDay => "cycleDay".to_string(),
            Operation::MenuForDate => "menuForDate".to_string(),
        }
    }

    /// Key of the payload inside `data`.
    pub fn response_key(&self) -> &'static str {
        match self {
            Operation::Node(kind)
            | Operation::Create(kind)
            | Operation::Update(kind)
            | Operation::Delete(kind) => kind.singular(),
            Operation::Collection(kind) => kind.plural(),
            Operation::CycleDay => "cycleDay",
            Operation::MenuForDate => "menuForDate",
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Operation::Create(_) | Operation::Update(_) | Operation::Delete(_)
        )
    }

    /// Every operation, in a stable order.
    pub fn all() -> Vec<Operation> {
        let mut operations: Vec<Operation> = EntityKind::iter()
            .flat_map(|kind| {
                [
                    Operation::Node(kind),
                    Operation::Collection(kind),
                    Operation::Create(kind),
                    Operation::Update(kind),
                    Operation::Delete(kind),
                ]
            })
            .collect();
        operations.extend([Operation::CycleDay, Operation::MenuForDate]);
        operations
    }
}

/// Body of `POST /api`.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationRequest {
    pub operation: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// `{"data": {<key>: payload | null}, "errors": [...]}`
#[derive(Debug, Clone, Serialize)]
pub struct OperationResponse {
    pub data: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorPayload>,
}

impl OperationResponse {
    pub fn success(operation: Operation, payload: Value) -> Self {
        let mut data = Map::new();
        data.insert(operation.response_key().to_string(), payload);
        Self {
            data,
            errors: Vec::new(),
        }
    }

    /// Null payload plus the error entry.
    pub fn failure(operation: Operation, error: &ServiceError) -> Self {
        let mut response = Self::success(operation, Value::Null);
        response.errors.push(error.payload());
        response
    }

    pub fn payload(&self) -> Option<&Value> {
        self.data.values().next()
    }
}

fn to_json<S: Serialize>(value: &S) -> Result<Value, ServiceError> {
    serde_json::to_value(value).map_err(|err| ServiceError::Internal(err.to_string()))
}

fn input(arguments: &Map<String, Value>) -> Result<&Value, ServiceError> {
    arguments
        .get("input")
        .ok_or_else(|| ServiceError::invalid_argument("input", "missing"))
}

/// Runs `operation`, returning its payload (`null` for an unresolved node).
pub fn execute(
    store: &Store,
    operation: Operation,
    arguments: &Map<String, Value>,
    max_page_size: usize,
) -> Result<Value, ServiceError> {
    match operation {
        Operation::Node(kind) => with_entity!(kind, T => {
            let id = arguments.get("id").unwrap_or(&Value::Null);
            to_json(&store.read(|tables| query::get::<T>(tables, id)))
        }),
        Operation::Collection(kind) => with_entity!(kind, T => {
            let connection =
                store.read(|tables| query::list::<T>(tables, arguments, max_page_size))?;
            to_json(&connection)
        }),
        Operation::Create(kind) => with_entity!(kind, T => {
            to_json(&mutation::create::<T>(store, input(arguments)?)?)
        }),
        Operation::Update(kind) => with_entity!(kind, T => {
            to_json(&mutation::update::<T>(store, input(arguments)?)?)
        }),
        Operation::Delete(kind) => with_entity!(kind, T => {
            to_json(&mutation::delete::<T>(store, input(arguments)?)?)
        }),
        Operation::CycleDay => to_json(&store.read(|tables| query::cycle_day(tables, arguments))?),
        Operation::MenuForDate => to_json(
            &store.read(|tables| query::menu_for_date(tables, arguments, max_page_size))?,
        ),
    }
}

/// Runs `operation` and wraps the outcome in the response envelope.
///
/// Failures become a null payload with an `errors` entry; each is logged and
/// counted against the operation.
pub fn respond(
    store: &Store,
    operation: Operation,
    arguments: &Map<String, Value>,
    max_page_size: usize,
) -> OperationResponse {
    let name = operation.name();
    let span = logging::operation_span(&name, operation.is_mutation());
    let _entered = span.enter();

    match execute(store, operation, arguments, max_page_size) {
        Ok(payload) => {
            tracing::debug!(found = !payload.is_null(), "operation complete");
            OperationResponse::success(operation, payload)
        }
        Err(error) => {
            error.track(&name);
            tracing::warn!(code = %error.code(), error = %error, "operation failed");
            OperationResponse::failure(operation, &error)
        }
    }
}
