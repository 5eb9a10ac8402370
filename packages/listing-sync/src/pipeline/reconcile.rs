//! Reconciliation of a fresh batch against the previous snapshot.
//!
//! Lifecycle mode keys records by their stable identifier: re-seen and new
//! records are `available`, records missing from the fresh batch are carried
//! forward as `sold`. Nothing is ever dropped.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::types::record::{Record, RecordKey, StatusedRecord};

/// Result of a lifecycle reconciliation.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Re-seen and new records in fresh order, then newly sold records in
    /// their previous relative order
    pub records: Vec<StatusedRecord>,

    /// Identifiers seen for the first time
    pub added: Vec<String>,

    /// Identifiers present before but absent from the fresh batch
    pub sold: Vec<String>,
}

impl Reconciliation {
    pub fn available_count(&self) -> usize {
        self.records.iter().filter(|r| !r.is_sold()).count()
    }
}

/// Merge `fresh` into `previous`.
///
/// Matched records take the previous fields overlaid by the fresh ones.
/// Within one fresh batch only the first occurrence of an identifier counts;
/// within `previous` the first occurrence is authoritative. Records without
/// an identifier never match: fresh ones pass through as available, previous
/// ones are carried as sold.
pub fn reconcile(previous: Vec<StatusedRecord>, fresh: Vec<Record>, key: &RecordKey) -> Reconciliation {
    let previous_ids: Vec<Option<String>> = previous.iter().map(|r| key.of(&r.record)).collect();

    let mut index: HashMap<&str, usize> = HashMap::with_capacity(previous.len());
    for (position, id) in previous_ids.iter().enumerate() {
        if let Some(id) = id {
            index.entry(id.as_str()).or_insert(position);
        }
    }

    let mut seen: HashSet<String> = HashSet::with_capacity(fresh.len());
    let mut matched: HashMap<usize, Record> = HashMap::new();
    let mut order: Vec<Slot> = Vec::with_capacity(fresh.len());
    let mut added = Vec::new();

    for record in fresh {
        let Some(id) = key.of(&record) else {
            order.push(Slot::New(record));
            continue;
        };

        if !seen.insert(id.clone()) {
            debug!(id = %id, "Dropping duplicate record in fresh batch");
            continue;
        }

        match index.get(id.as_str()) {
            Some(&position) => {
                matched.insert(position, record);
                order.push(Slot::Matched(position));
            }
            None => {
                added.push(id);
                order.push(Slot::New(record));
            }
        }
    }

    let mut previous: Vec<Option<StatusedRecord>> = previous.into_iter().map(Some).collect();
    let mut records = Vec::with_capacity(order.len() + previous.len());

    for slot in order {
        match slot {
            Slot::Matched(position) => {
                let mut merged = previous[position]
                    .take()
                    .map(|r| r.record)
                    .unwrap_or_default();
                if let Some(fresh) = matched.remove(&position) {
                    merged.overlay(fresh);
                }
                records.push(StatusedRecord::available(merged));
            }
            Slot::New(record) => records.push(StatusedRecord::available(record)),
        }
    }

    let mut sold = Vec::new();
    let mut carried: HashSet<&str> = HashSet::new();
    for (entry, id) in previous.into_iter().zip(previous_ids.iter()) {
        let Some(entry) = entry else { continue };
        match id {
            Some(id) if seen.contains(id) => {
                // shadowed duplicate of a re-seen id
                continue;
            }
            Some(id) => {
                if !carried.insert(id.as_str()) {
                    continue;
                }
                sold.push(id.clone());
            }
            None => {}
        }
        records.push(StatusedRecord::sold(entry.record));
    }

    Reconciliation {
        records,
        added,
        sold,
    }
}

/// Full replacement: the fresh batch is the new snapshot.
pub fn replace<T>(_previous: Vec<T>, fresh: Vec<T>) -> Vec<T> {
    fresh
}

enum Slot {
    Matched(usize),
    New(Record),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::RecordStatus;
    use serde_json::json;

    fn key() -> RecordKey {
        RecordKey::field("id")
    }

    fn rec(id: i64) -> Record {
        Record::new().with("id", id)
    }

    fn ids(result: &Reconciliation) -> Vec<(String, RecordStatus)> {
        result
            .records
            .iter()
            .map(|r| (key().of(&r.record).unwrap(), r.status))
            .collect()
    }

    #[test]
    fn test_end_to_end_scenario() {
        let previous = vec![StatusedRecord::available(rec(1)), StatusedRecord::available(rec(2))];
        let fresh = vec![rec(2).with("price", "40000"), rec(3)];

        let result = reconcile(previous, fresh, &key());

        assert_eq!(
            ids(&result),
            vec![
                ("2".to_string(), RecordStatus::Available),
                ("3".to_string(), RecordStatus::Available),
                ("1".to_string(), RecordStatus::Sold),
            ]
        );
        assert_eq!(result.added, vec!["3".to_string()]);
        assert_eq!(result.sold, vec!["1".to_string()]);
    }

    #[test]
    fn test_idempotent_when_fresh_equals_previous() {
        let records: Vec<Record> = (1..=5).map(|i| rec(i).with("title", format!("car {}", i))).collect();
        let previous: Vec<StatusedRecord> = records.iter().cloned().map(StatusedRecord::available).collect();

        let result = reconcile(previous.clone(), records, &key());

        assert_eq!(result.records, previous);
        assert!(result.sold.is_empty());
        assert!(result.added.is_empty());
    }

    #[test]
    fn test_fresh_fields_win_and_old_fields_survive() {
        let previous = vec![StatusedRecord::available(
            rec(1).with("price", "50000").with("dealer", "Brussels"),
        )];
        let fresh = vec![rec(1).with("price", "45000")];

        let result = reconcile(previous, fresh, &key());

        let merged = &result.records[0].record;
        assert_eq!(merged.get("price"), Some(&json!("45000")));
        assert_eq!(merged.get("dealer"), Some(&json!("Brussels")));
    }

    #[test]
    fn test_sold_stays_sold_and_is_never_dropped() {
        let first = reconcile(
            vec![StatusedRecord::available(rec(1)), StatusedRecord::available(rec(2))],
            vec![rec(2)],
            &key(),
        );
        let second = reconcile(first.records, vec![rec(2)], &key());

        assert_eq!(
            ids(&second),
            vec![
                ("2".to_string(), RecordStatus::Available),
                ("1".to_string(), RecordStatus::Sold),
            ]
        );
        // absent ids are reported on every run, not only the first
        assert_eq!(second.sold, vec!["1".to_string()]);
    }

    #[test]
    fn test_sold_record_reappearing_becomes_available() {
        let previous = vec![StatusedRecord::sold(rec(9))];
        let result = reconcile(previous, vec![rec(9)], &key());

        assert_eq!(ids(&result), vec![("9".to_string(), RecordStatus::Available)]);
    }

    #[test]
    fn test_coverage_and_cardinality() {
        let previous: Vec<StatusedRecord> = [1, 2, 3, 4, 5, 6]
            .into_iter()
            .map(|i| StatusedRecord::available(rec(i)))
            .collect();
        let fresh: Vec<Record> = [4, 7, 2, 8].into_iter().map(rec).collect();

        let result = reconcile(previous, fresh, &key());

        // |output| = |fresh| + |previous not re-seen|
        assert_eq!(result.records.len(), 4 + 4);
        for id in 1..=8 {
            let count = result
                .records
                .iter()
                .filter(|r| key().of(&r.record) == Some(id.to_string()))
                .count();
            assert_eq!(count, 1, "id {}", id);
        }
        assert_eq!(result.available_count(), 4);
        assert_eq!(result.sold, vec!["1", "3", "5", "6"]);
    }

    #[test]
    fn test_empty_previous_marks_everything_available() {
        let result = reconcile(vec![], vec![rec(1), rec(2)], &key());

        assert_eq!(result.available_count(), 2);
        assert_eq!(result.added.len(), 2);
    }

    #[test]
    fn test_empty_fresh_marks_everything_sold() {
        let previous = vec![StatusedRecord::available(rec(1)), StatusedRecord::available(rec(2))];
        let result = reconcile(previous, vec![], &key());

        assert!(result.records.iter().all(StatusedRecord::is_sold));
        assert_eq!(result.records.len(), 2);
    }

    #[test]
    fn test_duplicate_fresh_ids_keep_first() {
        let fresh = vec![rec(1).with("v", "first"), rec(1).with("v", "second")];
        let result = reconcile(vec![], fresh, &key());

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].record.get("v"), Some(&json!("first")));
    }

    #[test]
    fn test_records_without_id() {
        let previous = vec![StatusedRecord::available(Record::new().with("title", "orphan"))];
        let fresh = vec![Record::new().with("title", "anonymous")];

        let result = reconcile(previous, fresh, &key());

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].status, RecordStatus::Available);
        assert_eq!(result.records[1].status, RecordStatus::Sold);
    }

    #[test]
    fn test_replace_discards_previous() {
        assert_eq!(replace(vec![1, 2, 3], vec![4]), vec![4]);
    }
}
