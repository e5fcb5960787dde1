//! Write side: create, update and delete for any entity.
//!
//! Every mutation is a single store transaction. Validation runs inside the
//! transaction against the staged tables, followed by the table's own unique
//! constraints, so a concurrent writer cannot slip a conflicting record in
//! between the check and the commit.

use crate::domain::{Entity, GlobalId, Record, RecordId};
use crate::error::ServiceError;
use crate::store::Store;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Validates and stores a new record built from `input`.
pub fn create<T: Entity>(store: &Store, input: &Value) -> Result<Record<T>, ServiceError> {
    let value = T::from_input(decode_input(input)?);
    let record = store.transaction(|tables| {
        value.validate(None, tables)?;
        let id = T::table_mut(tables).insert(value.clone())?;
        Ok(Record::new(id, value))
    })?;
    debug!(kind = %T::KIND, id = %record.id, "created");
    Ok(record)
}

/// Merges the fields present in `input` into the record named by
/// `input.id` and stores the re-validated result.
pub fn update<T: Entity>(store: &Store, input: &Value) -> Result<Record<T>, ServiceError> {
    let id = resolve_id::<T>(input)?;
    let patch: T::Patch = decode_input(input)?;
    let record = store.transaction(|tables| {
        let mut value = T::table(tables)
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found(T::KIND, GlobalId::new(T::KIND, id)))?;
        value.apply(patch);
        value.validate(Some(id), tables)?;
        T::table_mut(tables).replace(id, value.clone())?;
        Ok(Record::new(id, value))
    })?;
    debug!(kind = %T::KIND, id = %record.id, "updated");
    Ok(record)
}

/// Removes the record named by `input.id` and returns it as it was.
///
/// Records still referenced by a menu item or event are kept.
pub fn delete<T: Entity>(store: &Store, input: &Value) -> Result<Record<T>, ServiceError> {
    let id = resolve_id::<T>(input)?;
    let global = GlobalId::new(T::KIND, id);
    let record = store.transaction(|tables| {
        if !T::table(tables).contains(id) {
            return Err(ServiceError::not_found(T::KIND, global));
        }
        if let Some(dependent) = tables.referenced_by(global) {
            return Err(ServiceError::Integrity {
                kind: T::KIND,
                constraint: format!("referenced_by_{}", dependent.singular()),
            });
        }
        let value = T::table_mut(tables)
            .remove(id)
            .ok_or_else(|| ServiceError::not_found(T::KIND, global))?;
        Ok(Record::new(id, value))
    })?;
    debug!(kind = %T::KIND, id = %record.id, "deleted");
    Ok(record)
}

fn decode_input<D: DeserializeOwned>(input: &Value) -> Result<D, ServiceError> {
    if !input.is_object() {
        return Err(ServiceError::invalid_argument("input", "expected an object"));
    }
    serde_json::from_value(input.clone())
        .map_err(|err| ServiceError::invalid_argument("input", err))
}

fn resolve_id<T: Entity>(input: &Value) -> Result<RecordId, ServiceError> {
    match input.get("id") {
        Some(Value::String(raw)) => {
            GlobalId::resolve(raw, T::KIND).ok_or_else(|| ServiceError::not_found(T::KIND, raw))
        }
        Some(other) => Err(ServiceError::not_found(T::KIND, other)),
        None => Err(ServiceError::invalid_argument("id", "missing")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Dish, EntityKind, Timetable};
    use assert_matches::assert_matches;
    use serde_json::json;

    fn create_dish(store: &Store, name: &str) -> Record<Dish> {
        create::<Dish>(store, &json!({"name": name, "description": "dish"})).unwrap()
    }

    #[test]
    fn create_assigns_ids() {
        let store = Store::in_memory();
        let rice = create_dish(&store, "rice");
        assert_eq!(rice.id, RecordId::new(1));
        assert_eq!(rice.value.name, "rice");
    }

    #[test]
    fn create_rejects_duplicates_through_validation() {
        let store = Store::in_memory();
        create_dish(&store, "rice");
        assert_matches!(
            create::<Dish>(&store, &json!({"name": "RICE"})),
            Err(ServiceError::Validation(_))
        );
        assert_eq!(store.read(|tables| tables.dishes.len()), 1);
    }

    #[test]
    fn create_rejects_malformed_input() {
        let store = Store::in_memory();
        assert_matches!(
            create::<Dish>(&store, &json!({"description": "no name"})),
            Err(ServiceError::InvalidArgument { .. })
        );
        assert_matches!(
            create::<Dish>(&store, &json!("rice")),
            Err(ServiceError::InvalidArgument { .. })
        );
    }

    #[test]
    fn update_merges_and_revalidates() {
        let store = Store::in_memory();
        let rice = create_dish(&store, "rice");
        create_dish(&store, "beans");

        let updated = update::<Dish>(
            &store,
            &json!({"id": rice.global_id().encode(), "name": "rice edited"}),
        )
        .unwrap();
        assert_eq!(updated.value.name, "rice edited");
        assert_eq!(updated.value.description, "dish");

        assert_matches!(
            update::<Dish>(&store, &json!({"id": rice.global_id().encode(), "name": "Beans"})),
            Err(ServiceError::Validation(_))
        );
        assert_matches!(
            update::<Dish>(&store, &json!({"id": "wrong-id", "name": "stew"})),
            Err(ServiceError::NotFound { kind: EntityKind::Dish, .. })
        );
    }

    #[test]
    fn update_revalidates_cross_field_rules() {
        let store = Store::in_memory();
        let timetable = create::<Timetable>(
            &store,
            &json!({
                "name": "fellows timetable",
                "code": "FT7871",
                "cycleLength": 14,
                "currentCycleDay": 2,
            }),
        )
        .unwrap();

        let result = update::<Timetable>(
            &store,
            &json!({"id": timetable.global_id().encode(), "cycleLength": 1}),
        );
        assert_matches!(result, Err(ServiceError::Validation(ref violations))
            if violations.touches("current_cycle_day"));
    }

    #[test]
    fn delete_returns_previous_state() {
        let store = Store::in_memory();
        let rice = create_dish(&store, "rice");
        let deleted = delete::<Dish>(&store, &json!({"id": rice.global_id().encode()})).unwrap();
        assert_eq!(deleted, rice);
        assert_matches!(
            delete::<Dish>(&store, &json!({"id": rice.global_id().encode()})),
            Err(ServiceError::NotFound { .. })
        );
    }
}
