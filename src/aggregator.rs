use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use crate::bucket::{BucketGranularity, BucketKey};
use crate::counter::{CounterPair, EventCounter, EventType};
use crate::error::AggregateError;
use crate::metrics::{EVENTS_REJECTED, EVENTS_TOTAL, LIVE_BUCKETS};

/// Drained, no-longer-shared form of the live table.
pub type LiveAggregateTable = HashMap<BucketKey, CounterPair>;

/// Owns the live (category, time bucket) -> counters table.
///
/// Increments hold the read side of `table` and bump atomics inside a
/// sharded map, so writers to the same or different buckets run in
/// parallel. `drain_all` takes the write side and swaps the whole map out,
/// so every increment lands either before the swap or after it.
#[derive(Debug, Default)]
pub struct BucketAggregator {
    granularity: BucketGranularity,
    table: RwLock<DashMap<BucketKey, EventCounter>>,
}

impl BucketAggregator {
    pub fn new(granularity: BucketGranularity) -> Self {
        Self {
            granularity,
            table: RwLock::new(DashMap::new()),
        }
    }

    pub fn increment(&self, category: &str, event: EventType, ts: DateTime<Utc>) -> BucketKey {
        let key = self.granularity.key(category, ts);
        {
            let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
            // shard read guard must be gone before entry() asks for the write guard
            let hit = table.get(&key).map(|counter| counter.increment(event)).is_some();
            if !hit {
                table
                    .entry(key.clone())
                    .or_insert_with(|| {
                        LIVE_BUCKETS.inc();
                        EventCounter::new()
                    })
                    .increment(event);
            }
        }
        EVENTS_TOTAL.with_label_values(&[event.as_str()]).inc();
        key
    }

    /// Like `increment`, for event types that arrive as text.
    pub fn record(
        &self,
        category: &str,
        event_type: &str,
        ts: DateTime<Utc>,
    ) -> Result<BucketKey, AggregateError> {
        let event = event_type.parse::<EventType>().inspect_err(|e| {
            EVENTS_REJECTED.inc();
            tracing::warn!(category, "Rejected event: {}", e);
        })?;
        Ok(self.increment(category, event, ts))
    }

    pub fn get(&self, key: &BucketKey) -> Option<CounterPair> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table.get(key).map(|counter| counter.snapshot())
    }

    // Copy of the live table, leaves it in place
    pub fn snapshot(&self) -> LiveAggregateTable {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().snapshot()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.table.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Atomically take every live bucket and leave an empty table behind.
    pub fn drain_all(&self) -> LiveAggregateTable {
        let drained = {
            let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
            LIVE_BUCKETS.set(0.0);
            std::mem::take(&mut *table)
        };
        drained
            .into_iter()
            .map(|(key, counter)| (key, counter.snapshot()))
            .collect()
    }
}
