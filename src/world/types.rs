use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag carried by sentinel objects that are always reachable.
pub const SPECIAL_TAG: &str = "special";

/// Tag carried by objects registered in the transient-safety set.
pub const TRANSIENT_TAG: &str = "transient";

/// Recipe name used for the root holder sentinel.
pub const ROOT_HOLDER_RECIPE: &str = "__root_holder_of_all";

/// Opaque construction arguments handed to `awake` and cached on the object.
pub type RecipeArgs = serde_json::Value;

/// Stable arena index of a world object. Indices are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(u32);

impl ObjectId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }

    pub(crate) fn slot(self) -> usize {
        self.0 as usize
    }

    /// Id for the arena slot `slot`, or `None` past the `u32` range.
    pub(crate) fn from_slot(slot: usize) -> Option<Self> {
        u32::try_from(slot).ok().map(Self)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for ObjectId {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

/// Closed set of values a property may hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum PropertyValue {
    #[default]
    Null,
    Number(f64),
    String(String),
    Bool(bool),
    Object(ObjectId),
    Numbers(Vec<f64>),
    Strings(Vec<String>),
    Bools(Vec<bool>),
    Objects(Vec<ObjectId>),
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            PropertyValue::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_objects(&self) -> Option<&[ObjectId]> {
        match self {
            PropertyValue::Objects(ids) => Some(ids),
            _ => None,
        }
    }

    /// Short name of the value kind, used in log records and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Number(_) => "number",
            PropertyValue::String(_) => "string",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Object(_) => "object",
            PropertyValue::Numbers(_) => "numbers",
            PropertyValue::Strings(_) => "strings",
            PropertyValue::Bools(_) => "bools",
            PropertyValue::Objects(_) => "objects",
        }
    }

    /// Loose equality.
    ///
    /// Values of the same kind compare exactly (lists element-wise, loosely).
    /// Numbers, numeric strings and booleans coerce to a number before
    /// comparing; `Null` only equals `Null`; object references never equal
    /// scalars.
    pub fn loosely_equals(&self, other: &PropertyValue) -> bool {
        use PropertyValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Null, _) | (_, Null) => false,
            (Object(a), Object(b)) => a == b,
            (Object(_), _) | (_, Object(_)) => false,
            (String(a), String(b)) => a == b,
            (Numbers(a), Numbers(b)) => a == b,
            (Bools(a), Bools(b)) => a == b,
            (Strings(a), Strings(b)) => a == b,
            (Objects(a), Objects(b)) => a == b,
            (Numbers(a), Strings(b)) | (Strings(b), Numbers(a)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(n, s)| Number(*n).loosely_equals(&String(s.clone())))
            }
            (Numbers(a), Bools(b)) | (Bools(b), Numbers(a)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(n, flag)| *n == if *flag { 1.0 } else { 0.0 })
            }
            (a, b) => match (a.coerce_number(), b.coerce_number()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    fn coerce_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            PropertyValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            PropertyValue::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
            _ => None,
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Number(value as f64)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<ObjectId> for PropertyValue {
    fn from(value: ObjectId) -> Self {
        PropertyValue::Object(value)
    }
}

impl From<Vec<ObjectId>> for PropertyValue {
    fn from(value: Vec<ObjectId>) -> Self {
        PropertyValue::Objects(value)
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PropertyValue::Null, Into::into)
    }
}

/// Which pass of `run_starts` is invoking a `start` callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartPhase {
    /// Pre-game pass, before the first turn is stepped.
    Initial,
    /// Turn-aware pass, once turn stepping is live.
    WithTurnStep,
}

/// Summary of a single `solidify` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Intact objects considered by the pass.
    pub examined: usize,
    /// Objects confirmed reachable (special objects included).
    pub reachable: usize,
    /// Objects physically removed from the index.
    pub swept: usize,
    /// Swept objects moved into the transient-safety set.
    pub transients_retained: usize,
}
