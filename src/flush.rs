//! Periodic hand-off of live aggregates to the store
//!
//! Each interval the live table is drained in one step and every bucket is
//! written to the `StoreWriter`. A failed write is logged and that bucket is
//! dropped for the interval, so a broken store never holds up later flushes.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use crate::aggregator::BucketAggregator;
use crate::metrics::{FLUSH_DURATION, FLUSH_RECORDS, FLUSH_TOTAL};
use crate::store::StoreWriter;

/// Outcome of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub drained: usize,
    pub written: usize,
    pub failed: usize,
}

pub struct FlushScheduler {
    aggregator: Arc<BucketAggregator>,
    writer: Arc<dyn StoreWriter>,
    interval: Duration,
    // held for the whole of a flush so two never overlap
    in_flight: Mutex<()>,
}

impl FlushScheduler {
    pub fn new(
        aggregator: Arc<BucketAggregator>,
        writer: Arc<dyn StoreWriter>,
        interval: Duration,
    ) -> Self {
        Self {
            aggregator,
            writer,
            interval,
            in_flight: Mutex::new(()),
        }
    }

    /// Drain and write now, waiting behind any flush already running.
    pub async fn flush(&self) -> FlushReport {
        let _guard = self.in_flight.lock().await;
        self.drain_and_write().await
    }

    // Timer path: skip the tick if a flush is still running
    async fn tick(&self) -> Option<FlushReport> {
        let _guard = self.in_flight.try_lock().ok()?;
        Some(self.drain_and_write().await)
    }

    async fn drain_and_write(&self) -> FlushReport {
        let start = Instant::now();
        let batch = self.aggregator.drain_all();
        let mut report = FlushReport {
            drained: batch.len(),
            ..FlushReport::default()
        };

        for (key, pair) in batch {
            match self.writer.write(&key, pair).await {
                Ok(()) => report.written += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        %key,
                        view = pair.view,
                        click = pair.click,
                        "Dropping bucket after store write failed: {}",
                        e
                    );
                }
            }
        }

        FLUSH_RECORDS.with_label_values(&["ok"]).inc_by(report.written as f64);
        FLUSH_RECORDS.with_label_values(&["error"]).inc_by(report.failed as f64);
        let status = if report.failed == 0 { "ok" } else { "partial" };
        FLUSH_TOTAL.with_label_values(&[status]).inc();
        FLUSH_DURATION.observe(start.elapsed().as_secs_f64());

        if report.drained > 0 {
            tracing::info!(
                drained = report.drained,
                written = report.written,
                failed = report.failed,
                "Flushed live aggregates"
            );
        }
        report
    }

    /// Run the flush loop until `cancel` fires.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> FlushTask {
        let scheduler = Arc::clone(&self);
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let period = scheduler.interval;
            let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!("Flush scheduler started (interval: {:?})", period);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if scheduler.tick().await.is_none() {
                            tracing::debug!("Previous flush still running, skipping tick");
                        }
                    }
                }
            }
            tracing::info!("Flush scheduler stopped");
        });

        FlushTask {
            scheduler: self,
            cancel,
            handle,
        }
    }
}

/// Handle to a running flush loop.
pub struct FlushTask {
    scheduler: Arc<FlushScheduler>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl FlushTask {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop ticking, wait for the loop to exit, then flush one last time.
    pub async fn shutdown(self) -> FlushReport {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            tracing::error!("Flush task ended abnormally: {}", e);
        }
        self.scheduler.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex as StdMutex;
    use crate::bucket::BucketKey;
    use crate::counter::{CounterPair, EventType};
    use crate::error::StoreError;
    use crate::store::MemoryStore;

    // Fails every write for one category, records the rest
    #[derive(Default)]
    struct FlakyStore {
        fail_category: String,
        written: StdMutex<Vec<(BucketKey, CounterPair)>>,
    }

    #[async_trait]
    impl StoreWriter for FlakyStore {
        async fn write(&self, key: &BucketKey, pair: CounterPair) -> Result<(), StoreError> {
            if key.category == self.fail_category {
                return Err(StoreError::Rejected {
                    key: key.to_string(),
                    reason: "category quarantined".to_string(),
                });
            }
            self.written.lock().unwrap().push((key.clone(), pair));
            Ok(())
        }
    }

    // Holds every write long enough for a tick to land mid-flush
    #[derive(Default)]
    struct SlowStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl StoreWriter for SlowStore {
        async fn write(&self, key: &BucketKey, pair: CounterPair) -> Result<(), StoreError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.inner.write(key, pair).await
        }
    }

    fn scheduler_with(
        writer: Arc<dyn StoreWriter>,
        interval: Duration,
    ) -> (Arc<BucketAggregator>, Arc<FlushScheduler>) {
        let aggregator = Arc::new(BucketAggregator::default());
        let scheduler = Arc::new(FlushScheduler::new(Arc::clone(&aggregator), writer, interval));
        (aggregator, scheduler)
    }

    #[tokio::test]
    async fn flush_writes_one_record_per_bucket() {
        let store = Arc::new(MemoryStore::new());
        let (agg, scheduler) = scheduler_with(store.clone(), Duration::from_secs(5));
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        for _ in 0..3 {
            agg.increment("sports", EventType::View, ts);
        }
        for _ in 0..2 {
            agg.increment("sports", EventType::Click, ts);
        }

        let report = scheduler.flush().await;

        assert_eq!(report, FlushReport { drained: 1, written: 1, failed: 0 });
        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, BucketKey::new("sports", "2024-01-01 10:00"));
        assert_eq!(records[0].pair, CounterPair::new(3, 2));
        assert!(agg.is_empty());
    }

    #[tokio::test]
    async fn failed_writes_do_not_stop_the_batch() {
        let store = Arc::new(FlakyStore {
            fail_category: "business".to_string(),
            ..FlakyStore::default()
        });
        let (agg, scheduler) = scheduler_with(store.clone(), Duration::from_secs(5));
        let ts = Utc::now();
        agg.increment("business", EventType::View, ts);
        agg.increment("sports", EventType::View, ts);
        agg.increment("education", EventType::Click, ts);

        let report = scheduler.flush().await;
        assert_eq!(report, FlushReport { drained: 3, written: 2, failed: 1 });
        let key = BucketKey::new("business", "x");
        assert!(matches!(
            store.write(&key, CounterPair::new(1, 0)).await,
            Err(StoreError::Rejected { key: rejected, .. }) if rejected == "business:x"
        ));
        // dropped, not requeued
        assert!(agg.is_empty());

        agg.increment("sports", EventType::View, ts);
        assert_eq!(scheduler.flush().await.written, 1);
        assert_eq!(store.written.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn empty_flush_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let (_agg, scheduler) = scheduler_with(store.clone(), Duration::from_secs(5));
        assert_eq!(scheduler.flush().await, FlushReport::default());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn loop_flushes_on_ticks_and_once_more_on_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let (agg, scheduler) = scheduler_with(store.clone(), Duration::from_millis(20));
        let task = scheduler.spawn(CancellationToken::new());

        agg.increment("sports", EventType::View, Utc::now());
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(store.len(), 1);
        assert!(agg.is_empty());

        agg.increment("education", EventType::Click, Utc::now());
        let last = task.shutdown().await;
        assert_eq!(last.written, 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn tick_is_skipped_while_a_flush_is_running() {
        let store = Arc::new(SlowStore::default());
        let (agg, scheduler) = scheduler_with(store.clone(), Duration::from_secs(60));
        agg.increment("sports", EventType::View, Utc::now());

        let running = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.flush().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // arrives mid-flush, after the drain
        agg.increment("business", EventType::Click, Utc::now());
        assert_eq!(scheduler.tick().await, None);
        assert_eq!(agg.len(), 1);

        let report = running.await.unwrap();
        assert_eq!(report, FlushReport { drained: 1, written: 1, failed: 0 });
        assert_eq!(store.inner.len(), 1);

        // the bucket left behind by the skipped tick goes out on the next one
        assert_eq!(scheduler.tick().await.map(|r| r.written), Some(1));
        assert_eq!(store.inner.len(), 2);
        assert!(agg.is_empty());
    }

    #[tokio::test]
    async fn external_cancel_stops_the_loop() {
        let store = Arc::new(MemoryStore::new());
        let (_agg, scheduler) = scheduler_with(store, Duration::from_secs(60));
        let cancel = CancellationToken::new();
        let task = scheduler.spawn(cancel.clone());

        cancel.cancel();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(task.is_finished());
    }
}
