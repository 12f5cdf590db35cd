//! In-memory record store.
//!
//! Holds rows exactly as they were inserted (loosely typed) and answers
//! inclusive time-range queries ordered by timestamp. Typing happens on the
//! way out through [`RawRow::parse`].

use std::sync::Arc;
use tokio::sync::RwLock;
use trackview_core::{RawRow, Record};

use crate::dataset::Frame;
use crate::error::ReplayError;

/// Append-only table of tracking rows.
#[derive(Debug, Default)]
pub struct RecordStore {
    rows: RwLock<Vec<RawRow>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an Arc-wrapped store for sharing between the feed and readers.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Appends one row.
    pub async fn insert(&self, row: RawRow) {
        self.rows.write().await.push(row);
    }

    /// Appends one row per instance of `frame`. Returns the number of rows.
    pub async fn insert_frame(&self, frame: &Frame) -> usize {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.extend(frame.rows());
        rows.len() - before
    }

    /// Rows with `from <= timestamp <= to`, ordered by timestamp.
    ///
    /// Rows whose timestamp cannot be read never match. Rows sharing a
    /// timestamp keep insertion order.
    pub async fn query_range(&self, from: u64, to: u64) -> Vec<RawRow> {
        let rows = self.rows.read().await;
        let mut hits: Vec<(u64, RawRow)> = rows
            .iter()
            .filter_map(|row| {
                let ts = row.timestamp_ms()?;
                (from..=to).contains(&ts).then(|| (ts, row.clone()))
            })
            .collect();
        hits.sort_by_key(|(ts, _)| *ts);
        hits.into_iter().map(|(_, row)| row).collect()
    }

    /// Range query followed by the parse step.
    pub async fn records_in_range(&self, from: u64, to: u64) -> Vec<Record> {
        self.query_range(from, to)
            .await
            .iter()
            .map(RawRow::parse)
            .collect()
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// All rows as pretty JSON, in insertion order.
    pub async fn dump_json(&self) -> Result<String, ReplayError> {
        let rows = self.rows.read().await;
        Ok(serde_json::to_string_pretty(&*rows)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn row(ts: Value, x: f64) -> RawRow {
        RawRow {
            timestamp: ts,
            pos_x: json!(x),
            pos_y: json!(0.0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_range_is_inclusive_and_sorted() {
        let store = RecordStore::new();
        store.insert(row(json!(3000), 3.0)).await;
        store.insert(row(json!("1000"), 1.0)).await;
        store.insert(row(json!(2000), 2.0)).await;
        store.insert(row(json!(4000), 4.0)).await;

        let records = store.records_in_range(1000, 3000).await;
        let xs: Vec<f64> = records.iter().map(|r| r.x()).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn test_invalid_timestamps_never_match() {
        let store = RecordStore::new();
        store.insert(row(Value::Null, 1.0)).await;
        store.insert(row(json!("later"), 1.0)).await;
        store.insert(row(json!(5), 1.0)).await;

        assert_eq!(store.len().await, 3);
        assert_eq!(store.query_range(0, u64::MAX).await.len(), 1);
    }

    #[tokio::test]
    async fn test_inverted_range_is_empty() {
        let store = RecordStore::new();
        store.insert(row(json!(10), 1.0)).await;
        assert!(store.query_range(20, 0).await.is_empty());
    }

    #[tokio::test]
    async fn test_dump_json_lists_rows() {
        let store = RecordStore::new();
        assert!(store.is_empty().await);
        store.insert(row(json!(10), 1.5)).await;
        let dumped: Vec<RawRow> = serde_json::from_str(&store.dump_json().await.unwrap()).unwrap();
        assert_eq!(dumped.len(), 1);
        assert_eq!(dumped[0].pos_x, json!(1.5));
    }

    proptest! {
        #[test]
        fn prop_query_returns_sorted_rows_within_range(
            stamps in prop::collection::vec(0u64..10_000, 0..60),
            from in 0u64..10_000,
            span in 0u64..10_000,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let to = from + span;
            let hits = rt.block_on(async {
                let store = RecordStore::new();
                for ts in &stamps {
                    store.insert(row(json!(ts), 0.0)).await;
                }
                store.query_range(from, to).await
            });

            let got: Vec<u64> = hits.iter().filter_map(|r| r.timestamp_ms()).collect();
            let mut expected: Vec<u64> = stamps.iter().copied().filter(|t| (from..=to).contains(t)).collect();
            expected.sort_unstable();
            prop_assert_eq!(got, expected);
        }
    }
}
