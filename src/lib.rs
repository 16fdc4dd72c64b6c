//! Live view/click aggregation per content category and time bucket,
//! periodically flushed to a store, with a rate-limited stats endpoint.

pub mod aggregator;
pub mod bucket;
pub mod config;
pub mod counter;
pub mod error;
pub mod flush;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod processor;
pub mod rate_limit;
pub mod state;
pub mod store;
