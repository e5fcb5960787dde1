//! Stored entity types with their columns, create inputs and update patches.

use super::{Entity, EntityField, EntityKind, FieldType, FieldValue, GlobalId, UniqueKey};
use crate::store::{Table, Tables};
use chrono::{DateTime, NaiveTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

fn text(value: &str) -> FieldValue {
    FieldValue::Text(value.to_string())
}

// ============================================================================
// Weekday
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weekday {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum WeekdayField {
    Name,
}

impl EntityField for WeekdayField {
    fn field_type(self) -> FieldType {
        FieldType::Text
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayInput {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayPatch {
    pub name: Option<String>,
}

impl Entity for Weekday {
    const KIND: EntityKind = EntityKind::Weekday;
    type Field = WeekdayField;
    type Input = WeekdayInput;
    type Patch = WeekdayPatch;

    fn from_input(input: WeekdayInput) -> Self {
        Self { name: input.name }
    }

    fn apply(&mut self, patch: WeekdayPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
    }

    fn field_value(&self, field: WeekdayField) -> FieldValue {
        match field {
            WeekdayField::Name => text(&self.name),
        }
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::text("weekday_name", &self.name)]
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.weekdays
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.weekdays
    }
}

// ============================================================================
// Meal
// ============================================================================

/// A named serving window within a day, e.g. breakfast 07:00-09:00.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum MealField {
    Name,
    StartTime,
    EndTime,
}

impl EntityField for MealField {
    fn field_type(self) -> FieldType {
        match self {
            MealField::Name => FieldType::Text,
            MealField::StartTime | MealField::EndTime => FieldType::Time,
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MealInput {
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MealPatch {
    pub name: Option<String>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

impl Entity for Meal {
    const KIND: EntityKind = EntityKind::Meal;
    type Field = MealField;
    type Input = MealInput;
    type Patch = MealPatch;

    fn from_input(input: MealInput) -> Self {
        Self {
            name: input.name,
            start_time: input.start_time,
            end_time: input.end_time,
        }
    }

    fn apply(&mut self, patch: MealPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(start_time) = patch.start_time {
            self.start_time = start_time;
        }
        if let Some(end_time) = patch.end_time {
            self.end_time = end_time;
        }
    }

    fn field_value(&self, field: MealField) -> FieldValue {
        match field {
            MealField::Name => text(&self.name),
            MealField::StartTime => FieldValue::Time(self.start_time),
            MealField::EndTime => FieldValue::Time(self.end_time),
        }
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::text("meal_name", &self.name)]
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.meals
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.meals
    }
}

// ============================================================================
// Course
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub name: String,
    pub sequence_order: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum CourseField {
    Name,
    SequenceOrder,
}

impl EntityField for CourseField {
    fn field_type(self) -> FieldType {
        match self {
            CourseField::Name => FieldType::Text,
            CourseField::SequenceOrder => FieldType::Integer,
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    pub name: String,
    pub sequence_order: u32,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoursePatch {
    pub name: Option<String>,
    pub sequence_order: Option<u32>,
}

impl Entity for Course {
    const KIND: EntityKind = EntityKind::Course;
    type Field = CourseField;
    type Input = CourseInput;
    type Patch = CoursePatch;

    fn from_input(input: CourseInput) -> Self {
        Self {
            name: input.name,
            sequence_order: input.sequence_order,
        }
    }

    fn apply(&mut self, patch: CoursePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(sequence_order) = patch.sequence_order {
            self.sequence_order = sequence_order;
        }
    }

    fn field_value(&self, field: CourseField) -> FieldValue {
        match field {
            CourseField::Name => text(&self.name),
            CourseField::SequenceOrder => FieldValue::Integer(i64::from(self.sequence_order)),
        }
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::text("course_name", &self.name)]
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.courses
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.courses
    }
}

// ============================================================================
// Dish
// ============================================================================

/// A dish. Names are unique regardless of letter case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dish {
    pub name: String,
    pub description: String,
}

impl Dish {
    /// Key the case-insensitive name constraint compares on.
    pub fn folded_name(&self) -> String {
        self.name.to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum DishField {
    Name,
    Description,
}

impl EntityField for DishField {
    fn field_type(self) -> FieldType {
        FieldType::Text
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DishInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DishPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Entity for Dish {
    const KIND: EntityKind = EntityKind::Dish;
    type Field = DishField;
    type Input = DishInput;
    type Patch = DishPatch;

    fn from_input(input: DishInput) -> Self {
        Self {
            name: input.name,
            description: input.description,
        }
    }

    fn apply(&mut self, patch: DishPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
    }

    fn field_value(&self, field: DishField) -> FieldValue {
        match field {
            DishField::Name => text(&self.name),
            DishField::Description => text(&self.description),
        }
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new(
            "dish_name_ci",
            vec![FieldValue::Text(self.folded_name())],
        )]
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.dishes
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.dishes
    }
}

// ============================================================================
// Timetable
// ============================================================================

/// A repeating menu schedule of `cycle_length` days.
///
/// `current_cycle_day` is the cycle day that was in effect when
/// `cycle_day_updated` was recorded; see [`super::schedule`] for how the day
/// advances from there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timetable {
    pub name: String,
    pub code: String,
    pub api_key: String,
    pub cycle_length: i32,
    pub current_cycle_day: i32,
    pub cycle_day_updated: DateTime<Utc>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum TimetableField {
    Name,
    Code,
    ApiKey,
    CycleLength,
    CurrentCycleDay,
    CycleDayUpdated,
    Description,
}

impl EntityField for TimetableField {
    fn field_type(self) -> FieldType {
        match self {
            TimetableField::Name
            | TimetableField::Code
            | TimetableField::ApiKey
            | TimetableField::Description => FieldType::Text,
            TimetableField::CycleLength | TimetableField::CurrentCycleDay => FieldType::Integer,
            TimetableField::CycleDayUpdated => FieldType::DateTime,
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimetableInput {
    pub name: String,
    pub code: String,
    /// Generated when omitted.
    pub api_key: Option<String>,
    pub cycle_length: i32,
    pub current_cycle_day: i32,
    /// Defaults to the time of creation.
    pub cycle_day_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimetablePatch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub api_key: Option<String>,
    pub cycle_length: Option<i32>,
    pub current_cycle_day: Option<i32>,
    pub cycle_day_updated: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

fn generate_api_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

impl Entity for Timetable {
    const KIND: EntityKind = EntityKind::Timetable;
    type Field = TimetableField;
    type Input = TimetableInput;
    type Patch = TimetablePatch;

    fn from_input(input: TimetableInput) -> Self {
        Self {
            name: input.name,
            code: input.code,
            api_key: input.api_key.unwrap_or_else(generate_api_key),
            cycle_length: input.cycle_length,
            current_cycle_day: input.current_cycle_day,
            cycle_day_updated: input.cycle_day_updated.unwrap_or_else(Utc::now),
            description: input.description,
        }
    }

    fn apply(&mut self, patch: TimetablePatch) {
        let TimetablePatch {
            name,
            code,
            api_key,
            cycle_length,
            current_cycle_day,
            cycle_day_updated,
            description,
        } = patch;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(code) = code {
            self.code = code;
        }
        if let Some(api_key) = api_key {
            self.api_key = api_key;
        }
        if let Some(cycle_length) = cycle_length {
            self.cycle_length = cycle_length;
        }
        if let Some(current_cycle_day) = current_cycle_day {
            self.current_cycle_day = current_cycle_day;
        }
        if let Some(cycle_day_updated) = cycle_day_updated {
            self.cycle_day_updated = cycle_day_updated;
        }
        if let Some(description) = description {
            self.description = description;
        }
    }

    fn field_value(&self, field: TimetableField) -> FieldValue {
        match field {
            TimetableField::Name => text(&self.name),
            TimetableField::Code => text(&self.code),
            TimetableField::ApiKey => text(&self.api_key),
            TimetableField::CycleLength => FieldValue::Integer(i64::from(self.cycle_length)),
            TimetableField::CurrentCycleDay => {
                FieldValue::Integer(i64::from(self.current_cycle_day))
            }
            TimetableField::CycleDayUpdated => FieldValue::DateTime(self.cycle_day_updated),
            TimetableField::Description => text(&self.description),
        }
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![
            UniqueKey::text("timetable_name", &self.name),
            UniqueKey::text("timetable_code", &self.code),
            UniqueKey::text("timetable_api_key", &self.api_key),
        ]
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.timetables
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.timetables
    }
}

// ============================================================================
// MenuItem
// ============================================================================

/// A dish served for one course of one meal on one cycle day of a timetable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub timetable: GlobalId,
    pub cycle_day: i32,
    pub meal: GlobalId,
    pub course: GlobalId,
    pub dish: GlobalId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum MenuItemField {
    Timetable,
    CycleDay,
    Meal,
    Course,
    Dish,
}

impl EntityField for MenuItemField {
    fn field_type(self) -> FieldType {
        match self {
            MenuItemField::Timetable => FieldType::Reference(EntityKind::Timetable),
            MenuItemField::CycleDay => FieldType::Integer,
            MenuItemField::Meal => FieldType::Reference(EntityKind::Meal),
            MenuItemField::Course => FieldType::Reference(EntityKind::Course),
            MenuItemField::Dish => FieldType::Reference(EntityKind::Dish),
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemInput {
    #[schemars(with = "String")]
    pub timetable: GlobalId,
    pub cycle_day: i32,
    #[schemars(with = "String")]
    pub meal: GlobalId,
    #[schemars(with = "String")]
    pub course: GlobalId,
    #[schemars(with = "String")]
    pub dish: GlobalId,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemPatch {
    #[schemars(with = "Option<String>")]
    pub timetable: Option<GlobalId>,
    pub cycle_day: Option<i32>,
    #[schemars(with = "Option<String>")]
    pub meal: Option<GlobalId>,
    #[schemars(with = "Option<String>")]
    pub course: Option<GlobalId>,
    #[schemars(with = "Option<String>")]
    pub dish: Option<GlobalId>,
}

impl Entity for MenuItem {
    const KIND: EntityKind = EntityKind::MenuItem;
    type Field = MenuItemField;
    type Input = MenuItemInput;
    type Patch = MenuItemPatch;

    fn from_input(input: MenuItemInput) -> Self {
        Self {
            timetable: input.timetable,
            cycle_day: input.cycle_day,
            meal: input.meal,
            course: input.course,
            dish: input.dish,
        }
    }

    fn apply(&mut self, patch: MenuItemPatch) {
        if let Some(timetable) = patch.timetable {
            self.timetable = timetable;
        }
        if let Some(cycle_day) = patch.cycle_day {
            self.cycle_day = cycle_day;
        }
        if let Some(meal) = patch.meal {
            self.meal = meal;
        }
        if let Some(course) = patch.course {
            self.course = course;
        }
        if let Some(dish) = patch.dish {
            self.dish = dish;
        }
    }

    fn field_value(&self, field: MenuItemField) -> FieldValue {
        match field {
            MenuItemField::Timetable => FieldValue::Reference(self.timetable),
            MenuItemField::CycleDay => FieldValue::Integer(i64::from(self.cycle_day)),
            MenuItemField::Meal => FieldValue::Reference(self.meal),
            MenuItemField::Course => FieldValue::Reference(self.course),
            MenuItemField::Dish => FieldValue::Reference(self.dish),
        }
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new(
            "menu_item_slot",
            vec![
                FieldValue::Reference(self.timetable),
                FieldValue::Integer(i64::from(self.cycle_day)),
                FieldValue::Reference(self.meal),
                FieldValue::Reference(self.course),
                FieldValue::Reference(self.dish),
            ],
        )]
    }

    fn references(&self) -> Vec<GlobalId> {
        vec![self.timetable, self.meal, self.course, self.dish]
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.menu_items
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.menu_items
    }
}

// ============================================================================
// Vendor
// ============================================================================

/// A catering vendor and the period it serves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum VendorField {
    Name,
    StartDate,
    EndDate,
}

impl EntityField for VendorField {
    fn field_type(self) -> FieldType {
        match self {
            VendorField::Name => FieldType::Text,
            VendorField::StartDate | VendorField::EndDate => FieldType::DateTime,
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VendorInput {
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VendorPatch {
    pub name: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Entity for Vendor {
    const KIND: EntityKind = EntityKind::Vendor;
    type Field = VendorField;
    type Input = VendorInput;
    type Patch = VendorPatch;

    fn from_input(input: VendorInput) -> Self {
        Self {
            name: input.name,
            start_date: input.start_date,
            end_date: input.end_date,
        }
    }

    fn apply(&mut self, patch: VendorPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = end_date;
        }
    }

    fn field_value(&self, field: VendorField) -> FieldValue {
        match field {
            VendorField::Name => text(&self.name),
            VendorField::StartDate => FieldValue::DateTime(self.start_date),
            VendorField::EndDate => FieldValue::DateTime(self.end_date),
        }
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::text("vendor_name", &self.name)]
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.vendors
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.vendors
    }
}

// ============================================================================
// Event
// ============================================================================

/// A dated exception on a timetable (holiday, special service, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub name: String,
    pub timetable: GlobalId,
    pub action: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum EventField {
    Name,
    Timetable,
    Action,
    StartDate,
    EndDate,
}

impl EntityField for EventField {
    fn field_type(self) -> FieldType {
        match self {
            EventField::Name | EventField::Action => FieldType::Text,
            EventField::Timetable => FieldType::Reference(EntityKind::Timetable),
            EventField::StartDate | EventField::EndDate => FieldType::DateTime,
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    pub name: String,
    #[schemars(with = "String")]
    pub timetable: GlobalId,
    #[serde(default)]
    pub action: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    pub name: Option<String>,
    #[schemars(with = "Option<String>")]
    pub timetable: Option<GlobalId>,
    pub action: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Entity for Event {
    const KIND: EntityKind = EntityKind::Event;
    type Field = EventField;
    type Input = EventInput;
    type Patch = EventPatch;

    fn from_input(input: EventInput) -> Self {
        Self {
            name: input.name,
            timetable: input.timetable,
            action: input.action,
            start_date: input.start_date,
            end_date: input.end_date,
        }
    }

    fn apply(&mut self, patch: EventPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(timetable) = patch.timetable {
            self.timetable = timetable;
        }
        if let Some(action) = patch.action {
            self.action = action;
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = end_date;
        }
    }

    fn field_value(&self, field: EventField) -> FieldValue {
        match field {
            EventField::Name => text(&self.name),
            EventField::Timetable => FieldValue::Reference(self.timetable),
            EventField::Action => text(&self.action),
            EventField::StartDate => FieldValue::DateTime(self.start_date),
            EventField::EndDate => FieldValue::DateTime(self.end_date),
        }
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new(
            "event_identity",
            vec![
                text(&self.name),
                FieldValue::Reference(self.timetable),
                text(&self.action),
                FieldValue::DateTime(self.start_date),
                FieldValue::DateTime(self.end_date),
            ],
        )]
    }

    fn references(&self) -> Vec<GlobalId> {
        vec![self.timetable]
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.events
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn field_names_are_snake_case() {
        assert_eq!(TimetableField::CurrentCycleDay.to_string(), "current_cycle_day");
        assert_eq!(MenuItemField::from_str("cycle_day"), Ok(MenuItemField::CycleDay));
        assert!(DishField::from_str("Name").is_err());
    }

    #[test]
    fn every_field_round_trips_through_its_name() {
        for field in TimetableField::iter() {
            assert_eq!(TimetableField::from_str(&field.to_string()), Ok(field));
        }
        for field in EventField::iter() {
            assert_eq!(EventField::from_str(&field.to_string()), Ok(field));
        }
    }

    #[test]
    fn dish_unique_key_ignores_case() {
        let lower = Dish {
            name: "coconut rice".to_string(),
            description: String::new(),
        };
        let mixed = Dish {
            name: "Coconut Rice".to_string(),
            description: "different".to_string(),
        };
        assert_eq!(lower.unique_keys(), mixed.unique_keys());
    }

    #[test]
    fn timetable_input_fills_generated_fields() {
        let timetable = Timetable::from_input(TimetableInput {
            name: "fellows timetable".to_string(),
            code: "FT7871".to_string(),
            api_key: None,
            cycle_length: 14,
            current_cycle_day: 2,
            cycle_day_updated: None,
            description: String::new(),
        });
        assert_eq!(timetable.api_key.len(), 32);
        assert!(timetable.cycle_day_updated <= Utc::now());
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let mut meal = Meal {
            name: "breakfast".to_string(),
            start_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        };
        meal.apply(MealPatch {
            end_time: NaiveTime::from_hms_opt(10, 0, 0),
            ..Default::default()
        });
        assert_eq!(meal.name, "breakfast");
        assert_eq!(meal.end_time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }
}
