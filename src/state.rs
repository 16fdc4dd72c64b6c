use std::sync::Arc;
use crate::aggregator::BucketAggregator;
use crate::config::Args;
use crate::error::ConfigError;
use crate::processor::RequestProcessor;
use crate::rate_limit::EndpointLimiters;
use crate::store::MemoryStore;

// Categories the simulated /view endpoint picks from
pub const DEFAULT_CATEGORIES: [&str; 4] = ["sports", "entertainment", "business", "education"];

// app's shared state
pub struct AppState {
    pub aggregator: Arc<BucketAggregator>,
    pub store: Arc<MemoryStore>,
    pub limiters: EndpointLimiters,
    pub processor: RequestProcessor,
    pub click_probability: f64, // chance of a follow-up click per view
}

impl AppState {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        args.validate()?;
        Ok(Self {
            aggregator: Arc::new(BucketAggregator::new(args.granularity()?)),
            store: Arc::new(MemoryStore::new()),
            limiters: EndpointLimiters::new(args.rate_limit, args.rate_window()),
            processor: RequestProcessor::new(args.max_process_delay()),
            click_probability: args.click_probability,
        })
    }
}
