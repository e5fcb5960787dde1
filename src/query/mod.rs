//! Read side: node lookup, filtered/ordered/paginated collections and the
//! timetable schedule queries.

pub mod connection;
pub mod filter;
pub mod order;
pub mod schedule;

pub use connection::{Connection, Edge, PageArgs, PageInfo, paginate};
pub use filter::{Column, Filter, Matcher, parse_filters};
pub use order::{Direction, OrderBy, SortKey};
pub use schedule::{CycleDay, cycle_day, menu_for_date};

use crate::domain::{Entity, GlobalId, Record, RecordId};
use crate::error::ServiceError;
use crate::store::Tables;
use serde_json::{Map, Value};

/// Looks up a node by its global id.
///
/// Anything that does not name a stored record of `T`'s kind (absent,
/// malformed, non-string, another kind) yields `None`.
pub fn get<T: Entity>(tables: &Tables, raw: &Value) -> Option<Record<T>> {
    let id = GlobalId::resolve(raw.as_str()?, T::KIND)?;
    T::table(tables).record(id)
}

/// Parsed arguments of a collection query.
#[derive(Debug, Clone)]
pub struct ListQuery<T: Entity> {
    pub filters: Vec<Filter<T::Field>>,
    pub order: Option<OrderBy<T::Field>>,
    pub page: PageArgs,
}

impl<T: Entity> ListQuery<T> {
    pub fn parse(
        arguments: &Map<String, Value>,
        max_page_size: usize,
    ) -> Result<Self, ServiceError> {
        let order = arguments
            .get("order_by")
            .or_else(|| arguments.get("orderBy"))
            .filter(|raw| !raw.is_null())
            .map(|raw| OrderBy::from_argument(T::KIND, raw))
            .transpose()?;

        Ok(Self {
            filters: parse_filters::<T>(arguments)?,
            order,
            page: PageArgs::parse(arguments, max_page_size)?,
        })
    }

    pub fn matches(&self, id: RecordId, value: &T) -> bool {
        self.filters.iter().all(|filter| filter.matches(id, value))
    }

    pub fn run(&self, tables: &Tables, max_page_size: usize) -> Connection<Record<T>> {
        let mut rows: Vec<(RecordId, &T)> = T::table(tables)
            .iter()
            .filter(|(id, value)| self.matches(*id, value))
            .collect();
        if let Some(order) = &self.order {
            order.sort(&mut rows);
        }
        paginate(rows, &self.page, max_page_size).map(|(id, value)| Record::new(id, value.clone()))
    }
}

/// Filters, orders and paginates the records of `T`.
pub fn list<T: Entity>(
    tables: &Tables,
    arguments: &Map<String, Value>,
    max_page_size: usize,
) -> Result<Connection<Record<T>>, ServiceError> {
    Ok(ListQuery::<T>::parse(arguments, max_page_size)?.run(tables, max_page_size))
}
