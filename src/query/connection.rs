//! Relay-style connections: cursor pagination over an ordered result set.
//!
//! Cursors name absolute offsets into the filtered and ordered collection, so
//! a cursor stays meaningful across pages of the same query.

use crate::domain::Cursor;
use crate::error::ServiceError;
use crate::validation::validate_page_request;
use serde::Serialize;
use serde_json::{Map, Value};

/// `first`/`last`/`after`/`before` of a list query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageArgs {
    pub first: Option<usize>,
    pub last: Option<usize>,
    pub after: Option<Cursor>,
    pub before: Option<Cursor>,
}

impl PageArgs {
    pub fn parse(
        arguments: &Map<String, Value>,
        max_page_size: usize,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            first: page_size(arguments, "first", max_page_size)?,
            last: page_size(arguments, "last", max_page_size)?,
            after: cursor(arguments, "after")?,
            before: cursor(arguments, "before")?,
        })
    }
}

fn page_size(
    arguments: &Map<String, Value>,
    name: &str,
    max_page_size: usize,
) -> Result<Option<usize>, ServiceError> {
    match arguments.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => {
            let requested = raw
                .as_i64()
                .ok_or_else(|| ServiceError::invalid_argument(name, "expected an integer"))?;
            validate_page_request(name, requested, max_page_size).map(Some)
        }
    }
}

fn cursor(arguments: &Map<String, Value>, name: &str) -> Result<Option<Cursor>, ServiceError> {
    match arguments.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => raw
            .as_str()
            .and_then(Cursor::decode)
            .map(Some)
            .ok_or_else(|| ServiceError::invalid_argument(name, "malformed cursor")),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge<N> {
    pub cursor: String,
    pub node: N,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<N> {
    pub edges: Vec<Edge<N>>,
    pub page_info: PageInfo,
    pub total_count: usize,
}

impl<N> Connection<N> {
    pub fn map<M>(self, mut f: impl FnMut(N) -> M) -> Connection<M> {
        Connection {
            edges: self
                .edges
                .into_iter()
                .map(|edge| Edge {
                    cursor: edge.cursor,
                    node: f(edge.node),
                })
                .collect(),
            page_info: self.page_info,
            total_count: self.total_count,
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.edges.iter().map(|edge| &edge.node)
    }
}

/// Slices `items` according to `page`.
///
/// Without `first` or `last` the page holds at most `max_page_size` items
/// from the start of the window.
pub fn paginate<N>(items: Vec<N>, page: &PageArgs, max_page_size: usize) -> Connection<N> {
    let total_count = items.len();

    let mut start = page
        .after
        .map(|cursor| cursor.offset().saturating_add(1))
        .unwrap_or(0)
        .min(total_count);
    let mut end = page
        .before
        .map(|cursor| cursor.offset())
        .unwrap_or(total_count)
        .clamp(start, total_count);

    if let Some(first) = page.first {
        end = end.min(start + first);
    }
    if let Some(last) = page.last {
        start = start.max(end.saturating_sub(last));
    }
    if page.first.is_none() && page.last.is_none() {
        end = end.min(start + max_page_size);
    }

    let edges: Vec<Edge<N>> = items
        .into_iter()
        .enumerate()
        .skip(start)
        .take(end - start)
        .map(|(offset, node)| Edge {
            cursor: Cursor::new(offset).encode(),
            node,
        })
        .collect();

    let page_info = PageInfo {
        has_next_page: end < total_count,
        has_previous_page: start > 0,
        start_cursor: edges.first().map(|edge| edge.cursor.clone()),
        end_cursor: edges.last().map(|edge| edge.cursor.clone()),
    };

    Connection {
        edges,
        page_info,
        total_count,
    }
}
