//! Per-entity validation rules.

use super::{Validate, ViolationKind, Violations};
use crate::domain::{
    Course, Dish, Entity, EntityKind, Event, GlobalId, Meal, MenuItem, RecordId, Timetable,
    Vendor, Weekday,
};
use crate::store::Tables;

/// Whether a record other than `id` satisfies `same`.
fn taken<T: Entity>(tables: &Tables, id: Option<RecordId>, same: impl Fn(&T) -> bool) -> bool {
    T::table(tables)
        .iter()
        .any(|(other_id, other)| Some(other_id) != id && same(other))
}

fn require_text(violations: &mut Violations, field: &str, value: &str) {
    if value.trim().is_empty() {
        violations.add(field, ViolationKind::Required, "must not be blank");
    }
}

fn require_unique_name<T: Entity>(
    violations: &mut Violations,
    tables: &Tables,
    id: Option<RecordId>,
    name: &str,
    same: impl Fn(&T) -> bool,
) {
    require_text(violations, "name", name);
    if taken(tables, id, same) {
        violations.add(
            "name",
            ViolationKind::Unique,
            format!("{} with name '{name}' already exists", T::KIND),
        );
    }
}

fn require_ordered<V: PartialOrd>(
    violations: &mut Violations,
    (start_field, start): (&str, V),
    (end_field, end): (&str, V),
) {
    if end <= start {
        violations.add(
            end_field,
            ViolationKind::Ordering,
            format!("must be later than {start_field}"),
        );
    }
}

fn require_reference(
    violations: &mut Violations,
    tables: &Tables,
    field: &str,
    reference: GlobalId,
    expected: EntityKind,
) -> bool {
    if reference.kind() != expected {
        violations.add(
            field,
            ViolationKind::Reference,
            format!("expected a {expected} id, got a {} id", reference.kind()),
        );
        return false;
    }
    if !tables.contains(reference) {
        violations.add(
            field,
            ViolationKind::Reference,
            format!("{expected} '{reference}' does not exist"),
        );
        return false;
    }
    true
}

impl Validate for Weekday {
    fn validate(&self, id: Option<RecordId>, tables: &Tables) -> Result<(), Violations> {
        let mut violations = Violations::new();
        require_unique_name(&mut violations, tables, id, &self.name, |other: &Weekday| {
            other.name == self.name
        });
        violations.into_result()
    }
}

impl Validate for Meal {
    fn validate(&self, id: Option<RecordId>, tables: &Tables) -> Result<(), Violations> {
        let mut violations = Violations::new();
        require_unique_name(&mut violations, tables, id, &self.name, |other: &Meal| {
            other.name == self.name
        });
        require_ordered(
            &mut violations,
            ("start_time", self.start_time),
            ("end_time", self.end_time),
        );
        violations.into_result()
    }
}

impl Validate for Course {
    fn validate(&self, id: Option<RecordId>, tables: &Tables) -> Result<(), Violations> {
        let mut violations = Violations::new();
        require_unique_name(&mut violations, tables, id, &self.name, |other: &Course| {
            other.name == self.name
        });
        violations.into_result()
    }
}

impl Validate for Dish {
    /// Dish names are compared case-insensitively: "Coconut Rice" collides
    /// with "coconut rice".
    fn validate(&self, id: Option<RecordId>, tables: &Tables) -> Result<(), Violations> {
        let mut violations = Violations::new();
        let folded = self.folded_name();
        require_unique_name(&mut violations, tables, id, &self.name, |other: &Dish| {
            other.folded_name() == folded
        });
        violations.into_result()
    }
}

impl Validate for Timetable {
    fn validate(&self, id: Option<RecordId>, tables: &Tables) -> Result<(), Violations> {
        let mut violations = Violations::new();
        require_unique_name(&mut violations, tables, id, &self.name, |other: &Timetable| {
            other.name == self.name
        });

        require_text(&mut violations, "code", &self.code);
        if taken(tables, id, |other: &Timetable| other.code == self.code) {
            violations.add(
                "code",
                ViolationKind::Unique,
                format!("Timetable with code '{}' already exists", self.code),
            );
        }

        require_text(&mut violations, "api_key", &self.api_key);
        if taken(tables, id, |other: &Timetable| other.api_key == self.api_key) {
            violations.add(
                "api_key",
                ViolationKind::Unique,
                "Timetable with this api key already exists",
            );
        }

        if self.cycle_length <= 0 {
            violations.add(
                "cycle_length",
                ViolationKind::Range,
                format!("must be greater than 0, got {}", self.cycle_length),
            );
        }
        if self.current_cycle_day <= 0 {
            violations.add(
                "current_cycle_day",
                ViolationKind::Range,
                format!("must be greater than 0, got {}", self.current_cycle_day),
            );
        } else if self.current_cycle_day > self.cycle_length {
            violations.add(
                "current_cycle_day",
                ViolationKind::Range,
                format!(
                    "must not exceed cycle_length {}, got {}",
                    self.cycle_length, self.current_cycle_day
                ),
            );
        }

        if let Some(id) = id
            && let Some(longest) = tables
                .menu_items
                .iter()
                .filter(|(_, item)| {
                    item.timetable.kind() == EntityKind::Timetable
                        && item.timetable.record_id() == id
                })
                .map(|(_, item)| item.cycle_day)
                .max()
            && longest > self.cycle_length
        {
            violations.add(
                "cycle_length",
                ViolationKind::Range,
                format!(
                    "must cover existing menu items up to cycle day {longest}, got {}",
                    self.cycle_length
                ),
            );
        }

        violations.into_result()
    }
}

impl Validate for MenuItem {
    fn validate(&self, id: Option<RecordId>, tables: &Tables) -> Result<(), Violations> {
        let mut violations = Violations::new();

        let timetable_ok = require_reference(
            &mut violations,
            tables,
            "timetable",
            self.timetable,
            EntityKind::Timetable,
        );
        require_reference(&mut violations, tables, "meal", self.meal, EntityKind::Meal);
        require_reference(&mut violations, tables, "course", self.course, EntityKind::Course);
        require_reference(&mut violations, tables, "dish", self.dish, EntityKind::Dish);

        if self.cycle_day < 1 {
            violations.add(
                "cycle_day",
                ViolationKind::Range,
                format!("must be at least 1, got {}", self.cycle_day),
            );
        } else if timetable_ok
            && let Some(timetable) = tables.timetables.get(self.timetable.record_id())
            && self.cycle_day > timetable.cycle_length
        {
            violations.add(
                "cycle_day",
                ViolationKind::Range,
                format!(
                    "must not exceed the timetable's cycle_length {}, got {}",
                    timetable.cycle_length, self.cycle_day
                ),
            );
        }

        if taken(tables, id, |other: &MenuItem| other == self) {
            violations.add(
                "cycle_day",
                ViolationKind::Unique,
                "menu item with this timetable, cycle day, meal, course and dish already exists",
            );
        }

        violations.into_result()
    }
}

impl Validate for Vendor {
    fn validate(&self, id: Option<RecordId>, tables: &Tables) -> Result<(), Violations> {
        let mut violations = Violations::new();
        require_unique_name(&mut violations, tables, id, &self.name, |other: &Vendor| {
            other.name == self.name
        });
        require_ordered(
            &mut violations,
            ("start_date", self.start_date),
            ("end_date", self.end_date),
        );
        violations.into_result()
    }
}

impl Validate for Event {
    /// Event identity (name, timetable, action, dates) is enforced by the
    /// store's `event_identity` constraint, not here.
    fn validate(&self, _id: Option<RecordId>, tables: &Tables) -> Result<(), Violations> {
        let mut violations = Violations::new();
        require_text(&mut violations, "name", &self.name);
        require_reference(
            &mut violations,
            tables,
            "timetable",
            self.timetable,
            EntityKind::Timetable,
        );
        require_ordered(
            &mut violations,
            ("start_date", self.start_date),
            ("end_date", self.end_date),
        );
        violations.into_result()
    }
}
