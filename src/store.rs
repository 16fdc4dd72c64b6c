//! Persistence seam for flushed aggregates

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use crate::bucket::BucketKey;
use crate::counter::CounterPair;
use crate::error::StoreError;

/// Destination for flushed buckets. Called once per drained entry, never
/// while any aggregator lock is held.
#[async_trait]
pub trait StoreWriter: Send + Sync {
    async fn write(&self, key: &BucketKey, pair: CounterPair) -> Result<(), StoreError>;
}

/// One flushed bucket as persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreRecord {
    pub key: BucketKey,
    pub pair: CounterPair,
    pub flushed_at: DateTime<Utc>,
}

/// Append-only in-memory store.
///
/// A bucket that spans two flush intervals is written twice; `totals`
/// sums those records back together.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<StoreRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<StoreRecord> {
        self.records.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn totals(&self) -> HashMap<BucketKey, CounterPair> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut totals: HashMap<BucketKey, CounterPair> = HashMap::new();
        for record in records.iter() {
            totals.entry(record.key.clone()).or_default().merge(record.pair);
        }
        totals
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StoreWriter for MemoryStore {
    async fn write(&self, key: &BucketKey, pair: CounterPair) -> Result<(), StoreError> {
        let record = StoreRecord {
            key: key.clone(),
            pair,
            flushed_at: Utc::now(),
        };
        self.records
            .write()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .push(record);
        tracing::debug!(%key, view = pair.view, click = pair.click, "Stored bucket");
        Ok(())
    }
}
