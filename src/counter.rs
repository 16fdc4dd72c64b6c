use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use crate::error::AggregateError;

// The two counter families tracked per bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    View,
    Click,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::View => "view",
            EventType::Click => "click",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(EventType::View),
            "click" => Ok(EventType::Click),
            _ => Err(AggregateError::UnknownEventType(s.to_string())),
        }
    }
}

/// Point-in-time counts for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterPair {
    pub view: u64,
    pub click: u64,
}

impl CounterPair {
    pub fn new(view: u64, click: u64) -> Self {
        Self { view, click }
    }

    pub fn merge(&mut self, other: CounterPair) {
        self.view += other.view;
        self.click += other.click;
    }
}

/// Live view/click counters for one bucket.
///
/// Increments are lock-free, so any number of writers can hit the same
/// bucket at once without losing updates.
#[derive(Debug, Default)]
pub struct EventCounter {
    view: AtomicU64,
    click: AtomicU64,
}

impl EventCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, event: EventType) {
        self.slot(event).fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, event: EventType) -> u64 {
        self.slot(event).load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterPair {
        CounterPair {
            view: self.view.load(Ordering::Relaxed),
            click: self.click.load(Ordering::Relaxed),
        }
    }

    fn slot(&self, event: EventType) -> &AtomicU64 {
        match event {
            EventType::View => &self.view,
            EventType::Click => &self.click,
        }
    }
}
