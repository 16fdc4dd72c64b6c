use chrono::{TimeZone, Utc};
use content_counter::aggregator::BucketAggregator;
use content_counter::bucket::{BucketGranularity, BucketKey};
use content_counter::counter::{CounterPair, EventType};
use content_counter::flush::{FlushReport, FlushScheduler};
use content_counter::store::MemoryStore;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn thousand_concurrent_views_on_one_key() {
    let agg = Arc::new(BucketAggregator::new(BucketGranularity::MINUTE));
    let ts = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

    let handles: Vec<_> = (0..1000)
        .map(|_| {
            let agg = Arc::clone(&agg);
            tokio::spawn(async move {
                agg.increment("sports", EventType::View, ts);
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let key = BucketKey::new("sports", "2024-01-01 10:00");
    assert_eq!(agg.get(&key), Some(CounterPair::new(1000, 0)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn flushes_racing_writers_preserve_every_event() {
    let agg = Arc::new(BucketAggregator::default());
    let store = Arc::new(MemoryStore::new());
    let scheduler = Arc::new(FlushScheduler::new(
        Arc::clone(&agg),
        store.clone(),
        Duration::from_secs(60),
    ));

    let writers: Vec<_> = (0..4)
        .map(|i| {
            let agg = Arc::clone(&agg);
            tokio::spawn(async move {
                let category = ["sports", "business"][i % 2];
                for n in 0..2_000 {
                    let event = if n % 4 == 0 { EventType::Click } else { EventType::View };
                    agg.increment(category, event, Utc::now());
                    if n % 250 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        })
        .collect();

    let flusher = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move {
            for _ in 0..20 {
                scheduler.flush().await;
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
    };

    for w in writers {
        w.await.unwrap();
    }
    flusher.await.unwrap();
    scheduler.flush().await;

    let mut total = CounterPair::default();
    for pair in store.totals().into_values() {
        total.merge(pair);
    }
    assert!(agg.is_empty());
    assert_eq!(total, CounterPair::new(6_000, 2_000));
}

#[tokio::test]
async fn flush_round_trip_empties_the_live_table() {
    let agg = Arc::new(BucketAggregator::default());
    let store = Arc::new(MemoryStore::new());
    let scheduler = FlushScheduler::new(Arc::clone(&agg), store.clone(), Duration::from_secs(5));
    let ts = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 30).unwrap();
    let key = BucketKey::new("sports", "2024-01-01 10:00");

    for _ in 0..3 {
        agg.increment("sports", EventType::View, ts);
    }
    for _ in 0..2 {
        agg.record("sports", "click", ts).unwrap();
    }
    assert_eq!(agg.get(&key), agg.get(&key));

    let report = scheduler.flush().await;
    assert_eq!(report, FlushReport { drained: 1, written: 1, failed: 0 });
    assert_eq!(agg.get(&key), None);

    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!((records[0].key.clone(), records[0].pair), (key, CounterPair::new(3, 2)));
}

#[tokio::test]
async fn bucket_spanning_two_flushes_sums_in_store() {
    let agg = Arc::new(BucketAggregator::default());
    let store = Arc::new(MemoryStore::new());
    let scheduler = FlushScheduler::new(Arc::clone(&agg), store.clone(), Duration::from_secs(5));
    let ts = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 1).unwrap();

    let key = agg.increment("education", EventType::View, ts);
    scheduler.flush().await;
    agg.increment("education", EventType::View, ts);
    agg.increment("education", EventType::Click, ts);
    scheduler.flush().await;

    assert_eq!(store.len(), 2);
    assert_eq!(store.totals().get(&key), Some(&CounterPair::new(2, 1)));
}
