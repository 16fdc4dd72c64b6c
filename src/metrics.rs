use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, TextEncoder, register_counter,
    register_counter_vec, register_gauge, register_histogram,
};

lazy_static! {
    pub static ref EVENTS_TOTAL: CounterVec = register_counter_vec!(
        "content_events_total",
        "Events counted, by event type",
        &["event_type"]
    )
    .unwrap();
    pub static ref EVENTS_REJECTED: Counter =
        register_counter!("content_events_rejected_total", "Events rejected as invalid input").unwrap();
    pub static ref LIVE_BUCKETS: Gauge =
        register_gauge!("content_live_buckets", "Buckets in the live aggregate table").unwrap();
    pub static ref FLUSH_TOTAL: CounterVec = register_counter_vec!(
        "content_flush_total",
        "Flushes run, by outcome",
        &["status"]
    )
    .unwrap();
    pub static ref FLUSH_RECORDS: CounterVec = register_counter_vec!(
        "content_flush_records_total",
        "Records handed to the store, by outcome",
        &["status"]
    )
    .unwrap();
    pub static ref FLUSH_DURATION: Histogram = register_histogram!(
        "content_flush_duration_seconds",
        "Time to drain and write one interval",
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    )
    .unwrap();
    pub static ref RATE_LIMIT_DECISIONS: CounterVec = register_counter_vec!(
        "content_rate_limit_decisions_total",
        "Rate limiter decisions, by endpoint and outcome",
        &["endpoint", "decision"]
    )
    .unwrap();
    pub static ref PROCESS_LATENCY: Histogram = register_histogram!(
        "content_process_latency_seconds",
        "Simulated upstream latency per view"
    )
    .unwrap();
}

// Render the default registry in Prometheus text format
pub fn encode_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| e.to_string())?;
    String::from_utf8(buffer).map_err(|e| e.to_string())
}
