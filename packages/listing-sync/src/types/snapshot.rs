//! Snapshots and the JSON documents they are persisted as.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{PersistResult, PersistenceError};

/// Field names a snapshot document uses on disk.
///
/// Lifecycle sources are stored as `{ data, retrievedAt }`, link-based sources
/// as `{ cars, timestamp }`. Both timestamps are epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotLayout {
    Statused,
    Listing,
}

impl SnapshotLayout {
    pub fn records_key(&self) -> &'static str {
        match self {
            SnapshotLayout::Statused => "data",
            SnapshotLayout::Listing => "cars",
        }
    }

    pub fn timestamp_key(&self) -> &'static str {
        match self {
            SnapshotLayout::Statused => "retrievedAt",
            SnapshotLayout::Listing => "timestamp",
        }
    }
}

/// The timestamped collection of records for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<R> {
    pub records: Vec<R>,
    pub retrieved_at: DateTime<Utc>,
}

impl<R> Snapshot<R> {
    pub fn new(records: Vec<R>, retrieved_at: DateTime<Utc>) -> Self {
        Self {
            records,
            retrieved_at,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<R: Serialize> Snapshot<R> {
    /// Encode as the on-disk document for `layout`.
    pub fn to_document(&self, layout: SnapshotLayout) -> PersistResult<Value> {
        let records = serde_json::to_value(&self.records).map_err(|e| PersistenceError::Corrupt {
            key: layout.records_key().to_string(),
            reason: e.to_string(),
        })?;

        let mut document = serde_json::Map::new();
        document.insert(layout.records_key().to_string(), records);
        document.insert(
            layout.timestamp_key().to_string(),
            json!(self.retrieved_at.timestamp_millis()),
        );
        Ok(Value::Object(document))
    }

    /// Encode as the HTTP response body.
    ///
    /// Lifecycle sources answer with the full document; link-based sources
    /// answer with a bare array of records.
    pub fn to_response(&self, layout: SnapshotLayout) -> PersistResult<Value> {
        match layout {
            SnapshotLayout::Statused => self.to_document(layout),
            SnapshotLayout::Listing => {
                serde_json::to_value(&self.records).map_err(|e| PersistenceError::Corrupt {
                    key: layout.records_key().to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl<R: DeserializeOwned> Snapshot<R> {
    /// Decode an on-disk document; `key` is only used in error messages.
    pub fn from_document(key: &str, document: Value, layout: SnapshotLayout) -> PersistResult<Self> {
        let Value::Object(mut map) = document else {
            return Err(corrupt(key, "document is not an object"));
        };

        let retrieved_at = map
            .get(layout.timestamp_key())
            .and_then(Value::as_i64)
            .and_then(from_millis)
            .ok_or_else(|| corrupt(key, format!("missing `{}`", layout.timestamp_key())))?;

        let records = map
            .remove(layout.records_key())
            .ok_or_else(|| corrupt(key, format!("missing `{}`", layout.records_key())))?;
        let records: Vec<R> =
            serde_json::from_value(records).map_err(|e| corrupt(key, e.to_string()))?;

        Ok(Self {
            records,
            retrieved_at,
        })
    }
}

/// Discovered item links for a link-based source, cached separately from
/// the detail records. Stored as `{ links, timestamp }`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkCache {
    pub links: Vec<String>,
    pub retrieved_at: DateTime<Utc>,
}

impl LinkCache {
    pub fn new(links: Vec<String>, retrieved_at: DateTime<Utc>) -> Self {
        Self {
            links,
            retrieved_at,
        }
    }

    pub fn to_document(&self) -> Value {
        json!({
            "timestamp": self.retrieved_at.timestamp_millis(),
            "links": self.links,
        })
    }

    pub fn from_document(key: &str, document: Value) -> PersistResult<Self> {
        let retrieved_at = document
            .get("timestamp")
            .and_then(Value::as_i64)
            .and_then(from_millis)
            .ok_or_else(|| corrupt(key, "missing `timestamp`"))?;

        let links = document
            .get("links")
            .and_then(Value::as_array)
            .ok_or_else(|| corrupt(key, "missing `links`"))?
            .iter()
            .filter_map(|link| link.as_str().map(str::to_string))
            .collect();

        Ok(Self {
            links,
            retrieved_at,
        })
    }
}

fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

fn corrupt(key: &str, reason: impl Into<String>) -> PersistenceError {
    PersistenceError::Corrupt {
        key: key.to_string(),
        reason: reason.into(),
    }
}
