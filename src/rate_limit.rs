use dashmap::DashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use crate::metrics::RATE_LIMIT_DECISIONS;

// Window state - one per guarded endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindowState {
    pub window_start: Instant,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Denied { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Fixed-window limiter: at most `limit` admissions per `window`.
///
/// Windows are sliding-start rather than calendar-aligned. Once a window
/// has expired, the next check opens a new one starting exactly at that
/// check's time, and that request counts as the new window's first
/// admission. A check at exactly `window_start + window` has expired.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    state: Mutex<RateWindowState>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::starting_at(limit, window, Instant::now())
    }

    pub fn starting_at(limit: u32, window: Duration, start: Instant) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new(RateWindowState {
                window_start: start,
                count: 0,
            }),
        }
    }

    pub fn check(&self, now: Instant) -> RateDecision {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        // window expired..? start a new one here
        if now.saturating_duration_since(state.window_start) >= self.window {
            state.window_start = now;
            state.count = 0;
        }

        if state.count < self.limit {
            state.count += 1;
            return RateDecision::Allowed {
                remaining: self.limit - state.count,
            };
        }

        let elapsed = now.saturating_duration_since(state.window_start);
        RateDecision::Denied {
            retry_after: self.window.saturating_sub(elapsed),
        }
    }

    pub fn check_now(&self) -> RateDecision {
        self.check(Instant::now())
    }

    pub fn state(&self) -> RateWindowState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Lazily created limiters, one per endpoint name.
#[derive(Debug)]
pub struct EndpointLimiters {
    limit: u32,
    window: Duration,
    limiters: DashMap<String, Arc<RateLimiter>>,
}

impl EndpointLimiters {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            limiters: DashMap::new(),
        }
    }

    pub fn for_endpoint(&self, endpoint: &str) -> Arc<RateLimiter> {
        self.limiters
            .entry(endpoint.to_string())
            .or_insert_with(|| Arc::new(RateLimiter::new(self.limit, self.window)))
            .clone()
    }

    pub fn check(&self, endpoint: &str) -> RateDecision {
        let decision = self.for_endpoint(endpoint).check_now();
        let outcome = if decision.is_allowed() { "allowed" } else { "denied" };
        RATE_LIMIT_DECISIONS.with_label_values(&[endpoint, outcome]).inc();
        decision
    }
}
