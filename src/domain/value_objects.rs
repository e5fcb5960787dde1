//! Identifier value objects with the NewType pattern.
//!
//! Every stored record carries two identifiers:
//!
//! - a [`RecordId`]: the numeric primary key assigned by its table, exposed to
//!   clients as `originalId`;
//! - a [`GlobalId`]: an opaque string that also names the entity kind, exposed
//!   as `id` and accepted everywhere an identifier is expected.
//!
//! ```rust,ignore
//! let id = GlobalId::new(EntityKind::Dish, RecordId::new(1));
//! assert_eq!(id.encode(), "RGlzaDox");
//! assert_eq!(GlobalId::decode("RGlzaDox"), Some(id));
//! ```

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

// ============================================================================
// RecordId - table-local primary key
// ============================================================================

/// Primary key of a record inside its table.
///
/// Assigned by the store, monotonically increasing and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// EntityKind - the closed set of stored entity types
// ============================================================================

/// Entity types known to the store.
///
/// The `Display`/`FromStr` form (`Dish`, `MenuItem`) is the prefix used inside
/// global identifiers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum EntityKind {
    Weekday,
    Meal,
    Course,
    Dish,
    Timetable,
    MenuItem,
    Vendor,
    Event,
}

impl EntityKind {
    /// Response key and single-node operation name, e.g. `menuItem`.
    pub fn singular(self) -> &'static str {
        match self {
            EntityKind::Weekday => "weekday",
            EntityKind::Meal => "meal",
            EntityKind::Course => "course",
            EntityKind::Dish => "dish",
            EntityKind::Timetable => "timetable",
            EntityKind::MenuItem => "menuItem",
            EntityKind::Vendor => "vendor",
            EntityKind::Event => "event",
        }
    }

    /// Collection operation name, e.g. `dishes`.
    pub fn plural(self) -> &'static str {
        match self {
            EntityKind::Weekday => "weekdays",
            EntityKind::Meal => "meals",
            EntityKind::Course => "courses",
            EntityKind::Dish => "dishes",
            EntityKind::Timetable => "timetables",
            EntityKind::MenuItem => "menuItems",
            EntityKind::Vendor => "vendors",
            EntityKind::Event => "events",
        }
    }
}

// ============================================================================
// GlobalId - opaque, kind-qualified identifier
// ============================================================================

/// Kind-qualified identifier, encoded as base64 of `"<Kind>:<RecordId>"`.
///
/// Decoding never fails loudly: anything that is not a well-formed global id
/// resolves to `None`, which callers treat as "not found".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalId {
    kind: EntityKind,
    id: RecordId,
}

impl GlobalId {
    pub const fn new(kind: EntityKind, id: RecordId) -> Self {
        Self { kind, id }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn record_id(&self) -> RecordId {
        self.id
    }

    pub fn encode(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.kind, self.id))
    }

    pub fn decode(raw: &str) -> Option<Self> {
        let bytes = STANDARD.decode(raw.trim()).ok()?;
        let text = String::from_utf8(bytes).ok()?;
        let (kind, id) = text.split_once(':')?;
        let kind = EntityKind::from_str(kind).ok()?;
        let id = id.parse::<u64>().ok()?;
        Some(Self::new(kind, RecordId::new(id)))
    }

    /// Decodes `raw` and keeps it only when it names a record of `kind`.
    pub fn resolve(raw: &str, kind: EntityKind) -> Option<RecordId> {
        Self::decode(raw)
            .filter(|global| global.kind == kind)
            .map(|global| global.id)
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl Serialize for GlobalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for GlobalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        GlobalId::decode(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("malformed global id '{raw}'")))
    }
}

// ============================================================================
// Cursor - position inside an ordered collection
// ============================================================================

const CURSOR_PREFIX: &str = "arrayconnection:";

/// Opaque connection cursor naming an offset in an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor(usize);

impl Cursor {
    pub const fn new(offset: usize) -> Self {
        Self(offset)
    }

    pub const fn offset(self) -> usize {
        self.0
    }

    pub fn encode(self) -> String {
        STANDARD.encode(format!("{CURSOR_PREFIX}{}", self.0))
    }

    pub fn decode(raw: &str) -> Option<Self> {
        let bytes = STANDARD.decode(raw.trim()).ok()?;
        let text = String::from_utf8(bytes).ok()?;
        text.strip_prefix(CURSOR_PREFIX)?
            .parse::<usize>()
            .ok()
            .map(Self)
    }
}
