use clap::Parser;
use std::time::Duration;
use crate::bucket::BucketGranularity;
use crate::error::ConfigError;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "content-counter")]
#[command(about = "Live view/click counters per content category, flushed to a store")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "COUNTER_PORT", default_value_t = 8080)]
    pub port: u16,

    // How often live aggregates are handed to the store, in seconds
    #[arg(long, env = "COUNTER_FLUSH_INTERVAL_SECS", default_value_t = 5)]
    pub flush_interval_secs: u64,

    // Max /stats requests per window
    #[arg(long, env = "COUNTER_RATE_LIMIT", default_value_t = 5)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, env = "COUNTER_RATE_WINDOW_SECS", default_value_t = 10)]
    pub rate_window_secs: u64,

    // Width of a time bucket in seconds
    #[arg(long, env = "COUNTER_BUCKET_SECS", default_value_t = 60)]
    pub bucket_secs: u64,

    // Upper bound of the simulated per-view work, in milliseconds
    #[arg(long, env = "COUNTER_MAX_PROCESS_DELAY_MS", default_value_t = 50)]
    pub max_process_delay_ms: u64,

    // Chance that a simulated view is followed by a click
    #[arg(long, env = "COUNTER_CLICK_PROBABILITY", default_value_t = 0.5)]
    pub click_probability: f64,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            port: 8080,
            flush_interval_secs: 5,
            rate_limit: 5,
            rate_window_secs: 10,
            bucket_secs: 60,
            max_process_delay_ms: 50,
            click_probability: 0.5,
        }
    }
}

impl Args {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flush_interval_secs == 0 {
            return Err(ConfigError::Zero("flush interval"));
        }
        if self.rate_window_secs == 0 {
            return Err(ConfigError::Zero("rate limit window"));
        }
        if !(0.0..=1.0).contains(&self.click_probability) {
            return Err(ConfigError::Probability(self.click_probability));
        }
        self.granularity().map(|_| ())
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    pub fn max_process_delay(&self) -> Duration {
        Duration::from_millis(self.max_process_delay_ms)
    }

    pub fn granularity(&self) -> Result<BucketGranularity, ConfigError> {
        BucketGranularity::from_duration(Duration::from_secs(self.bucket_secs))
    }
}
