//! Timetable schedule queries: the cycle day on a date and the menu served
//! on it.

use super::connection::{Connection, PageArgs, paginate};
use crate::domain::{EntityKind, GlobalId, MenuItem, Record, RecordId, Timetable};
use crate::error::ServiceError;
use crate::store::Tables;
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleDay {
    pub timetable: GlobalId,
    pub date: NaiveDate,
    pub cycle_day: i32,
    pub cycle_length: i32,
}

/// Resolves the `timetable` argument; `None` when it names no timetable.
fn timetable(tables: &Tables, arguments: &Map<String, Value>) -> Option<Record<Timetable>> {
    let id = GlobalId::resolve(arguments.get("timetable")?.as_str()?, EntityKind::Timetable)?;
    tables.timetables.record(id)
}

/// The `date` argument, today (UTC) when absent.
fn date(arguments: &Map<String, Value>) -> Result<NaiveDate, ServiceError> {
    match arguments.get("date") {
        None | Some(Value::Null) => Ok(Utc::now().date_naive()),
        Some(raw) => raw
            .as_str()
            .and_then(|text| NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok())
            .ok_or_else(|| ServiceError::invalid_argument("date", "expected YYYY-MM-DD")),
    }
}

pub fn cycle_day(
    tables: &Tables,
    arguments: &Map<String, Value>,
) -> Result<Option<CycleDay>, ServiceError> {
    let date = date(arguments)?;
    Ok(timetable(tables, arguments).map(|record| CycleDay {
        timetable: record.global_id(),
        date,
        cycle_day: record.value.cycle_day_on(date),
        cycle_length: record.value.cycle_length,
    }))
}

/// Menu items of the timetable on the cycle day in effect on `date`, by meal
/// start time, then course sequence, then insertion.
pub fn menu_for_date(
    tables: &Tables,
    arguments: &Map<String, Value>,
    max_page_size: usize,
) -> Result<Option<Connection<Record<MenuItem>>>, ServiceError> {
    let date = date(arguments)?;
    let page = PageArgs::parse(arguments, max_page_size)?;
    let Some(timetable) = timetable(tables, arguments) else {
        return Ok(None);
    };
    let day = timetable.value.cycle_day_on(date);
    let timetable_id = timetable.global_id();

    let mut items: Vec<(RecordId, &MenuItem)> = tables
        .menu_items
        .iter()
        .filter(|(_, item)| item.timetable == timetable_id && item.cycle_day == day)
        .collect();

    items.sort_by_cached_key(|(id, item)| {
        let starts = tables
            .meals
            .get(item.meal.record_id())
            .map(|meal| meal.start_time)
            .unwrap_or(NaiveTime::MIN);
        let sequence = tables
            .courses
            .get(item.course.record_id())
            .map(|course| course.sequence_order)
            .unwrap_or(u32::MAX);
        (starts, sequence, *id)
    });

    Ok(Some(
        paginate(items, &page, max_page_size).map(|(id, item)| Record::new(id, item.clone())),
    ))
}
