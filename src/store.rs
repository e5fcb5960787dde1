//! In-process record storage.
//!
//! One [`Table`] per entity kind holds records in insertion order under
//! store-assigned [`RecordId`]s. Tables enforce each entity's storage-level
//! unique constraints ([`Entity::unique_keys`]) on every write; this is the
//! last line of enforcement behind validation, and the only one for
//! constraints validation does not check.
//!
//! [`Store`] wraps all tables behind a single lock. Writes run as
//! transactions against a working copy that replaces the live tables only
//! when the closure succeeds (and, with a snapshot file configured, once the
//! copy has been persisted), so a failed write never leaves partial state.

use crate::domain::{
    Course, Dish, Entity, EntityKind, Event, GlobalId, Meal, MenuItem, Record, RecordId,
    Timetable, Vendor, Weekday,
};
use crate::error::ServiceError;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tempfile::NamedTempFile;
use tracing::{debug, info};

// ============================================================================
// Table
// ============================================================================

/// Records of one entity kind, in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize",
    deserialize = "T: serde::de::DeserializeOwned"
))]
pub struct Table<T> {
    #[serde(with = "indexmap::map::serde_seq")]
    rows: IndexMap<RecordId, T>,
    next_id: u64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: IndexMap::new(),
            next_id: 1,
        }
    }
}

impl<T: Entity> Table<T> {
    pub fn get(&self, id: RecordId) -> Option<&T> {
        self.rows.get(&id)
    }

    pub fn record(&self, id: RecordId) -> Option<Record<T>> {
        self.get(id).map(|value| Record::new(id, value.clone()))
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &T)> {
        self.rows.iter().map(|(id, value)| (*id, value))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Stores `value` under a fresh id.
    pub fn insert(&mut self, value: T) -> Result<RecordId, ServiceError> {
        self.check_unique(None, &value)?;
        let id = RecordId::new(self.next_id);
        self.next_id += 1;
        self.rows.insert(id, value);
        Ok(id)
    }

    /// Overwrites the record stored under `id`, keeping its position.
    pub fn replace(&mut self, id: RecordId, value: T) -> Result<(), ServiceError> {
        if !self.contains(id) {
            return Err(ServiceError::not_found(T::KIND, id));
        }
        self.check_unique(Some(id), &value)?;
        self.rows.insert(id, value);
        Ok(())
    }

    pub fn remove(&mut self, id: RecordId) -> Option<T> {
        self.rows.shift_remove(&id)
    }

    fn check_unique(&self, id: Option<RecordId>, value: &T) -> Result<(), ServiceError> {
        let keys = value.unique_keys();
        if keys.is_empty() {
            return Ok(());
        }
        for (other_id, other) in self.iter() {
            if Some(other_id) == id {
                continue;
            }
            let other_keys = other.unique_keys();
            if let Some(key) = keys.iter().find(|key| other_keys.contains(key)) {
                return Err(ServiceError::Integrity {
                    kind: T::KIND,
                    constraint: key.constraint.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Raises `next_id` past every stored id; ids are never reused.
    fn reseat(&mut self) {
        let highest = self.rows.keys().map(|id| id.get()).max().unwrap_or(0);
        self.next_id = self.next_id.max(highest + 1);
    }
}

// ============================================================================
// Tables
// ============================================================================

/// Every table of the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tables {
    pub weekdays: Table<Weekday>,
    pub meals: Table<Meal>,
    pub courses: Table<Course>,
    pub dishes: Table<Dish>,
    pub timetables: Table<Timetable>,
    pub menu_items: Table<MenuItem>,
    pub vendors: Table<Vendor>,
    pub events: Table<Event>,
}

impl Tables {
    /// Whether `id` names a stored record of its kind.
    pub fn contains(&self, id: GlobalId) -> bool {
        let record_id = id.record_id();
        match id.kind() {
            EntityKind::Weekday => self.weekdays.contains(record_id),
            EntityKind::Meal => self.meals.contains(record_id),
            EntityKind::Course => self.courses.contains(record_id),
            EntityKind::Dish => self.dishes.contains(record_id),
            EntityKind::Timetable => self.timetables.contains(record_id),
            EntityKind::MenuItem => self.menu_items.contains(record_id),
            EntityKind::Vendor => self.vendors.contains(record_id),
            EntityKind::Event => self.events.contains(record_id),
        }
    }

    /// Kind of some record that references `target`, if any does.
    pub fn referenced_by(&self, target: GlobalId) -> Option<EntityKind> {
        fn points_at<T: Entity>(table: &Table<T>, target: GlobalId) -> bool {
            table
                .iter()
                .any(|(_, value)| value.references().contains(&target))
        }

        if points_at(&self.menu_items, target) {
            Some(EntityKind::MenuItem)
        } else if points_at(&self.events, target) {
            Some(EntityKind::Event)
        } else {
            None
        }
    }

    /// Record count per table, keyed by collection name.
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        BTreeMap::from([
            (EntityKind::Weekday.plural(), self.weekdays.len()),
            (EntityKind::Meal.plural(), self.meals.len()),
            (EntityKind::Course.plural(), self.courses.len()),
            (EntityKind::Dish.plural(), self.dishes.len()),
            (EntityKind::Timetable.plural(), self.timetables.len()),
            (EntityKind::MenuItem.plural(), self.menu_items.len()),
            (EntityKind::Vendor.plural(), self.vendors.len()),
            (EntityKind::Event.plural(), self.events.len()),
        ])
    }

    fn reseat(&mut self) {
        self.weekdays.reseat();
        self.meals.reseat();
        self.courses.reseat();
        self.dishes.reseat();
        self.timetables.reseat();
        self.menu_items.reseat();
        self.vendors.reseat();
        self.events.reseat();
    }
}

// ============================================================================
// Store
// ============================================================================

/// Shared, transactional access to [`Tables`], optionally backed by a JSON
/// snapshot file.
#[derive(Debug)]
pub struct Store {
    tables: RwLock<Tables>,
    snapshot: Option<PathBuf>,
    write_failures: AtomicU64,
    last_write_failed: AtomicBool,
}

/// Outcome counters for snapshot writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotWrites {
    pub failures: u64,
    pub last_failed: bool,
}

impl Store {
    pub fn in_memory() -> Self {
        Self::with_tables(Tables::default(), None)
    }

    /// Opens a store persisted at `path`, loading the snapshot if the file
    /// exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let path = path.into();
        let tables = if path.exists() {
            let raw = fs::read(&path).map_err(|err| storage_error(&path, err))?;
            let mut tables: Tables =
                serde_json::from_slice(&raw).map_err(|err| storage_error(&path, err))?;
            tables.reseat();
            info!(
                path = %path.display(),
                records = tables.counts().values().sum::<usize>(),
                "loaded snapshot"
            );
            tables
        } else {
            info!(path = %path.display(), "no snapshot found, starting empty");
            Tables::default()
        };

        Ok(Self::with_tables(tables, Some(path)))
    }

    fn with_tables(tables: Tables, snapshot: Option<PathBuf>) -> Self {
        Self {
            tables: RwLock::new(tables),
            snapshot,
            write_failures: AtomicU64::new(0),
            last_write_failed: AtomicBool::new(false),
        }
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    pub fn snapshot_writes(&self) -> SnapshotWrites {
        SnapshotWrites {
            failures: self.write_failures.load(Ordering::Relaxed),
            last_failed: self.last_write_failed.load(Ordering::Relaxed),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        f(&self.tables.read())
    }

    /// Runs `f` against a working copy of the tables and commits it only if
    /// `f` succeeds and the snapshot (if any) was written.
    pub fn transaction<R>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<R, ServiceError>,
    ) -> Result<R, ServiceError> {
        let mut live = self.tables.write();
        let mut working = live.clone();
        let result = f(&mut working)?;
        if let Some(path) = &self.snapshot {
            self.record_write(write_snapshot(path, &working))?;
        }
        *live = working;
        Ok(result)
    }

    /// Writes the current tables to the snapshot file, if one is configured.
    pub fn flush(&self) -> Result<(), ServiceError> {
        match &self.snapshot {
            Some(path) => self.record_write(write_snapshot(path, &self.tables.read())),
            None => Ok(()),
        }
    }

    fn record_write(&self, result: Result<(), ServiceError>) -> Result<(), ServiceError> {
        self.last_write_failed.store(result.is_err(), Ordering::Relaxed);
        if result.is_err() {
            self.write_failures.fetch_add(1, Ordering::Relaxed);
        }
        result
    }
}

fn storage_error(path: &Path, err: impl std::fmt::Display) -> ServiceError {
    ServiceError::Storage(format!("{}: {err}", path.display()))
}

fn write_snapshot(path: &Path, tables: &Tables) -> Result<(), ServiceError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|err| storage_error(path, err))?;

    let mut temp_file = NamedTempFile::new_in(parent).map_err(|err| storage_error(path, err))?;
    serde_json::to_writer(&mut temp_file, tables).map_err(|err| storage_error(path, err))?;
    temp_file.flush().map_err(|err| storage_error(path, err))?;
    temp_file
        .persist(path)
        .map_err(|err| storage_error(path, err))?;

    debug!(path = %path.display(), "snapshot written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    fn dish(name: &str) -> Dish {
        Dish {
            name: name.to_string(),
            description: String::new(),
        }
    }

    fn event(name: &str, timetable: GlobalId) -> Event {
        Event {
            name: name.to_string(),
            timetable,
            action: String::new(),
            start_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn snapshot_write_outcomes_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let store = Store::open(blocker.join("records.json")).unwrap();

        let failed = store.transaction(|tables| tables.dishes.insert(dish("rice")));
        assert_matches!(failed, Err(ServiceError::Storage(_)));
        assert_eq!(
            store.snapshot_writes(),
            SnapshotWrites {
                failures: 1,
                last_failed: true
            }
        );
        assert_eq!(store.read(|tables| tables.dishes.len()), 0);

        fs::remove_file(&blocker).unwrap();
        store
            .transaction(|tables| tables.dishes.insert(dish("rice")))
            .unwrap();
        assert_eq!(
            store.snapshot_writes(),
            SnapshotWrites {
                failures: 1,
                last_failed: false
            }
        );
    }

    #[test]
    fn ids_increase_and_are_not_reused() {
        let mut table = Table::<Dish>::default();
        let rice = table.insert(dish("rice")).unwrap();
        let beans = table.insert(dish("beans")).unwrap();
        assert_eq!(rice, RecordId::new(1));
        assert_eq!(beans, RecordId::new(2));

        table.remove(beans);
        let yam = table.insert(dish("yam")).unwrap();
        assert_eq!(yam, RecordId::new(3));
    }

    #[test]
    fn removal_keeps_insertion_order() {
        let mut table = Table::<Dish>::default();
        for name in ["a", "b", "c", "d"] {
            table.insert(dish(name)).unwrap();
        }
        table.remove(RecordId::new(2));
        let names: Vec<_> = table.iter().map(|(_, d)| d.name.as_str()).collect();
        assert_eq!(names, ["a", "c", "d"]);
    }

    #[test]
    fn unique_keys_reject_duplicates() {
        let mut table = Table::<Dish>::default();
        table.insert(dish("Coconut Rice")).unwrap();
        assert_matches!(
            table.insert(dish("coconut rice")),
            Err(ServiceError::Integrity { kind: EntityKind::Dish, ref constraint })
                if constraint == "dish_name_ci"
        );
    }

    #[test]
    fn replace_may_keep_own_unique_values() {
        let mut table = Table::<Dish>::default();
        let id = table.insert(dish("rice")).unwrap();
        assert!(table.replace(id, dish("Rice")).is_ok());
        assert_matches!(
            table.replace(RecordId::new(9), dish("stew")),
            Err(ServiceError::NotFound { .. })
        );
    }

    #[test]
    fn event_identity_is_a_storage_constraint() {
        let mut table = Table::<Event>::default();
        let timetable = GlobalId::new(EntityKind::Timetable, RecordId::new(1));
        table.insert(event("holiday", timetable)).unwrap();
        assert_matches!(
            table.insert(event("holiday", timetable)),
            Err(ServiceError::Integrity { kind: EntityKind::Event, .. })
        );
    }

    #[test]
    fn failed_transaction_leaves_tables_untouched() {
        let store = Store::in_memory();
        store
            .transaction(|tables| tables.dishes.insert(dish("rice")))
            .unwrap();

        let result = store.transaction(|tables| {
            tables.dishes.insert(dish("beans"))?;
            tables.dishes.insert(dish("RICE"))
        });
        assert!(result.is_err());
        assert_eq!(store.read(|tables| tables.dishes.len()), 1);
    }

    #[test]
    fn referenced_by_finds_dependents() {
        let mut tables = Tables::default();
        let timetable = GlobalId::new(EntityKind::Timetable, RecordId::new(4));
        tables.events.insert(event("holiday", timetable)).unwrap();

        assert_eq!(tables.referenced_by(timetable), Some(EntityKind::Event));
        let other = GlobalId::new(EntityKind::Timetable, RecordId::new(5));
        assert_eq!(tables.referenced_by(other), None);
    }

    #[test]
    fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timetable.json");

        let store = Store::open(&path).unwrap();
        store
            .transaction(|tables| {
                tables.dishes.insert(dish("rice"))?;
                tables.dishes.insert(dish("beans"))
            })
            .unwrap();
        drop(store);

        let reopened = Store::open(&path).unwrap();
        let names: Vec<String> =
            reopened.read(|tables| tables.dishes.iter().map(|(_, d)| d.name.clone()).collect());
        assert_eq!(names, ["rice", "beans"]);

        let next = reopened
            .transaction(|tables| tables.dishes.insert(dish("yam")))
            .unwrap();
        assert_eq!(next, RecordId::new(3));
    }

    #[test]
    fn corrupt_snapshot_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timetable.json");
        fs::write(&path, b"not json").unwrap();
        assert_matches!(Store::open(&path), Err(ServiceError::Storage(_)));
    }
}
