//! Records, statuses, and identifier lookup.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ParseError, ParseResult};

/// A harvested record: field name to scalar or list value.
///
/// Every field is optional since extraction can partially fail. Vendor API
/// hits are stored as-is; the identifier is located with a [`RecordKey`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> ParseResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ParseError::shape(format!(
                "expected a JSON object, got {}",
                kind_of(&other)
            ))),
        }
    }

    /// Set a field (builder style).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Overlay `other` on top of this record; `other` wins on conflicting keys.
    pub fn overlay(&mut self, other: Record) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Locates the stable identifier inside a record (JSON pointer syntax).
///
/// `RecordKey::new("/vehicle/vssId")` reads `record["vehicle"]["vssId"]`.
/// String and numeric identifiers are accepted; numbers are stringified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn new(pointer: impl Into<String>) -> Self {
        Self(pointer.into())
    }

    /// Key on a top-level field.
    pub fn field(name: &str) -> Self {
        Self(format!("/{}", name))
    }

    pub fn pointer(&self) -> &str {
        &self.0
    }

    /// Resolve the identifier for `record`, if present.
    pub fn of(&self, record: &Record) -> Option<String> {
        let mut segments = self.0.split('/').skip(1).map(unescape);
        let first = segments.next()?;
        let mut current = record.0.get(first.as_str())?;

        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment.as_str())?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        match current {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Lifecycle status of a record in a reconciled snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Available,
    Sold,
}

/// A record tagged with its lifecycle status.
///
/// Serialized flat: the record's fields plus a `status` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusedRecord {
    #[serde(flatten)]
    pub record: Record,
    pub status: RecordStatus,
}

impl StatusedRecord {
    pub fn new(mut record: Record, status: RecordStatus) -> Self {
        // status lives beside the fields, never inside them
        record.remove("status");
        Self { record, status }
    }

    pub fn available(record: Record) -> Self {
        Self::new(record, RecordStatus::Available)
    }

    pub fn sold(record: Record) -> Self {
        Self::new(record, RecordStatus::Sold)
    }

    pub fn is_sold(&self) -> bool {
        self.status == RecordStatus::Sold
    }
}

/// A listing scraped from an HTML detail page.
///
/// The link doubles as the stable identifier: these sites expose no vendor id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub title: Option<String>,
    pub price: Option<String>,
    pub km: Option<String>,
    pub power: Option<String>,
    pub dealer: Option<String>,
    pub link: Option<String>,
    pub options: Option<Vec<String>>,
}

impl Listing {
    /// All-null placeholder for a detail page that could not be fetched or parsed.
    pub fn sentinel(link: impl Into<String>) -> Self {
        Self {
            link: Some(link.into()),
            ..Default::default()
        }
    }

    /// True when nothing but the link was extracted.
    pub fn is_sentinel(&self) -> bool {
        self.title.is_none()
            && self.price.is_none()
            && self.km.is_none()
            && self.power.is_none()
            && self.dealer.is_none()
            && self.options.is_none()
    }
}
