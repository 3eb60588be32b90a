//! Circuit breaker for repeated `NotFound` reports on the same item.
//!
//! A single missing item is normal (a file was moved between listing and
//! display). The same id failing several times in quick succession means the
//! queue keeps re-offering a dead reference, so the caller should stop
//! retrying and remove it everywhere at once.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::config::BreakerConfig;

/// Counts `NotFound` events per id inside a sliding time window.
#[derive(Debug)]
pub struct NotFoundBreaker {
    threshold: usize,
    window: Duration,
    events: HashMap<String, VecDeque<Instant>>,
}

impl NotFoundBreaker {
    pub fn new(threshold: usize, window: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            window,
            events: HashMap::new(),
        }
    }

    pub fn from_config(config: &BreakerConfig) -> Self {
        Self::new(config.threshold, Duration::from_secs(config.window_secs))
    }

    /// Record an event now. Returns `true` when the breaker trips for `id`.
    pub fn record(&mut self, id: &str) -> bool {
        self.record_at(id, Instant::now())
    }

    /// Record an event at a given instant.
    ///
    /// Tripping clears the id's history, so a later burst has to reach the
    /// threshold again before tripping a second time.
    pub fn record_at(&mut self, id: &str, at: Instant) -> bool {
        self.prune(at);
        let events = self.events.entry(id.to_string()).or_default();
        events.push_back(at);

        if events.len() >= self.threshold {
            self.events.remove(id);
            tracing::warn!(id = %id, threshold = self.threshold, "NotFound circuit breaker tripped");
            true
        } else {
            false
        }
    }

    /// Drop events older than the window, and ids left with none.
    fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.events.retain(|_, events| {
            while events
                .front()
                .is_some_and(|&oldest| now.saturating_duration_since(oldest) > window)
            {
                events.pop_front();
            }
            !events.is_empty()
        });
    }

    /// Number of ids with at least one event counted.
    pub fn tracked(&self) -> usize {
        self.events.len()
    }

    /// Number of events currently counted for `id`.
    pub fn pending(&self, id: &str) -> usize {
        self.events.get(id).map_or(0, VecDeque::len)
    }

    /// Forget an id (e.g. after it was removed for another reason).
    pub fn forget(&mut self, id: &str) {
        self.events.remove(id);
    }
}

impl Default for NotFoundBreaker {
    fn default() -> Self {
        Self::from_config(&BreakerConfig::default())
    }
}
