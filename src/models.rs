use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::aggregator::LiveAggregateTable;
use crate::bucket::BucketKey;
use crate::counter::CounterPair;

// Body of POST /event
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct EventRequest {
    pub category: String,
    pub event_type: String,
    // defaults to the time the request arrives
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct EventResponse {
    pub key: String,
    pub counts: CounterPair,
}

// One bucket in a stats listing
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct BucketStats {
    pub category: String,
    pub time_bucket: String,
    pub view: u64,
    pub click: u64,
}

impl BucketStats {
    pub fn from_entry(key: &BucketKey, pair: &CounterPair) -> Self {
        Self {
            category: key.category.clone(),
            time_bucket: key.time_bucket.clone(),
            view: pair.view,
            click: pair.click,
        }
    }

    // Sorted by category then bucket so responses are stable
    pub fn listing<'a>(entries: impl IntoIterator<Item = (&'a BucketKey, &'a CounterPair)>) -> Vec<Self> {
        let mut out: Vec<Self> = entries
            .into_iter()
            .map(|(key, pair)| Self::from_entry(key, pair))
            .collect();
        out.sort_by(|a, b| (&a.category, &a.time_bucket).cmp(&(&b.category, &b.time_bucket)));
        out
    }
}

// Body of GET /stats
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct StatsResponse {
    pub live: Vec<BucketStats>,
    pub stored: Vec<BucketStats>,
    pub remaining_requests: u32,
}

impl StatsResponse {
    pub fn new(
        live: &LiveAggregateTable,
        stored: &LiveAggregateTable,
        remaining_requests: u32,
    ) -> Self {
        Self {
            live: BucketStats::listing(live),
            stored: BucketStats::listing(stored),
            remaining_requests,
        }
    }
}

// Body of GET /view
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ViewResponse {
    pub key: String,
    pub clicked: bool,
    pub processing_ms: u64,
}
