use rand::Rng;
use std::time::Duration;
use crate::metrics::PROCESS_LATENCY;

// Stands in for upstream work done per view, with a random bounded delay
#[derive(Debug, Clone)]
pub struct RequestProcessor {
    max_delay: Duration,
}

impl RequestProcessor {
    pub fn new(max_delay: Duration) -> Self {
        Self { max_delay }
    }

    /// Sleep for a random duration in `[0, max_delay)` and return it.
    /// Callers must not hold any aggregator state across this.
    pub async fn process(&self) -> Duration {
        let delay = self.pick_delay();
        tokio::time::sleep(delay).await;
        PROCESS_LATENCY.observe(delay.as_secs_f64());
        delay
    }

    fn pick_delay(&self) -> Duration {
        let max_ms = self.max_delay.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
    }
}

// Whether the simulated visitor follows a view with a click
pub fn should_click(probability: f64) -> bool {
    rand::thread_rng().gen_bool(probability.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delay_stays_below_the_bound() {
        let processor = RequestProcessor::new(Duration::from_millis(5));
        for _ in 0..20 {
            assert!(processor.process().await < Duration::from_millis(5));
        }
    }

    #[tokio::test]
    async fn zero_bound_does_not_sleep() {
        let processor = RequestProcessor::new(Duration::ZERO);
        assert_eq!(processor.process().await, Duration::ZERO);
    }

    #[test]
    fn click_probability_extremes() {
        assert!(!should_click(0.0));
        assert!(should_click(1.0));
    }
}
