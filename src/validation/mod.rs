//! Write-time validation.
//!
//! Every entity implements [`Validate`]; the mutation layer calls it on the
//! complete record (freshly created, or merged with an update patch) before
//! anything reaches the store. Rules cover:
//! - uniqueness of designated fields and field tuples
//! - ranges (cycle length, cycle days)
//! - temporal ordering (end strictly after start)
//! - required text and resolvable references
//!
//! A failed check yields [`Violations`], a non-empty list of
//! field-level [`Violation`]s, instead of an early error, so a client sees
//! every problem with its input at once.
//!
//! The module also carries pagination bounds ([`bounds`]) and the JSON
//! schemas of operation inputs ([`schema`]).

pub mod bounds;
pub mod rules;
pub mod schema;

pub use bounds::{
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE, validate_page_request, validate_page_size,
};
pub use schema::OperationSchemas;

use crate::domain::RecordId;
use crate::store::Tables;
use serde::Serialize;
use std::fmt;

/// Entity-level rule check.
pub trait Validate {
    /// Checks `self` as it would be stored under `id` (`None` when creating)
    /// against the current contents of `tables`.
    fn validate(&self, id: Option<RecordId>, tables: &Tables) -> Result<(), Violations>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Required text is blank
    Required,
    /// Value (or value tuple) already used by another record
    Unique,
    /// Number outside its permitted range
    Range,
    /// End bound not strictly after start bound
    Ordering,
    /// Reference does not resolve to a record of the expected kind
    Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: String,
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: Violation) {
        self.0.push(violation);
    }

    pub fn add(&mut self, field: &str, kind: ViolationKind, message: impl Into<String>) {
        self.push(Violation::new(field, kind, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[Violation] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }

    /// Whether any violation concerns `field`.
    pub fn touches(&self, field: &str) -> bool {
        self.0.iter().any(|violation| violation.field == field)
    }

    pub fn into_result(self) -> Result<(), Violations> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, violation) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_violations_are_ok() {
        assert_eq!(Violations::new().into_result(), Ok(()));
    }

    #[test]
    fn violations_display_every_field() {
        let mut violations = Violations::new();
        violations.add("cycle_length", ViolationKind::Range, "must be greater than 0");
        violations.add("name", ViolationKind::Unique, "already exists");

        assert!(violations.touches("name"));
        assert!(!violations.touches("code"));
        assert_eq!(
            violations.to_string(),
            "cycle_length: must be greater than 0; name: already exists"
        );
    }
}
