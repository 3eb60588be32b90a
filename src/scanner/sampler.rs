//! Weighted sampling and adaptive total-count estimation.
//!
//! The sampler decides, file by file, whether a newly discovered item enters
//! the pending queue. It never knows the true collection size, so the
//! [`TotalEstimator`] supplies a running guess that is revised as discovery
//! progresses and frozen once a full pass completes.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::config::{EngineConfig, PriorityRule, SamplingConfig};

/// Per-folder weights and per-file inclusion probabilities.
#[derive(Debug, Clone)]
pub struct WeightedSampler {
    target_queue_size: usize,
    priority: Vec<PriorityRule>,
}

impl WeightedSampler {
    pub fn new(target_queue_size: usize, priority: Vec<PriorityRule>) -> Self {
        Self {
            target_queue_size: target_queue_size.max(1),
            priority,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.sampling.target_queue_size, config.priority.clone())
    }

    pub fn target_queue_size(&self) -> usize {
        self.target_queue_size
    }

    /// Weight contributed by the number of files in a folder.
    pub fn base_weight(file_count: usize) -> f64 {
        match file_count {
            0 => 0.0,
            n if n < 5 => n as f64 * 0.5,
            n => (n as f64).log10() * 10.0,
        }
    }

    /// Largest multiplier among the priority rules matching `path`, or 1.0.
    pub fn path_multiplier(&self, path: &str) -> f64 {
        self.priority
            .iter()
            .filter(|rule| rule.regex.is_match(path))
            .map(|rule| rule.multiplier)
            .fold(None, |best: Option<f64>, m| Some(best.map_or(m, |b| b.max(m))))
            .unwrap_or(1.0)
    }

    /// Boost for very large folders.
    pub fn size_multiplier(file_count: usize) -> f64 {
        if file_count > 10_000 {
            1.8
        } else if file_count > 1_000 {
            1.5
        } else if file_count > 100 {
            1.2
        } else {
            1.0
        }
    }

    pub fn folder_weight(&self, path: &str, file_count: usize) -> f64 {
        Self::base_weight(file_count) * self.path_multiplier(path) * Self::size_multiplier(file_count)
    }

    /// Ramp applied while the queue is still small so it fills quickly.
    pub fn queue_adjustment(queue_len: usize) -> f64 {
        if queue_len < 10 {
            10.0
        } else if queue_len < 30 {
            3.0
        } else if queue_len < 50 {
            1.5
        } else {
            1.0
        }
    }

    /// Probability that a file in `folder` enters a queue currently holding
    /// `queue_len` items, given an estimated collection size.
    pub fn file_probability(&self, folder: &str, estimated_total: u64, queue_len: usize) -> f64 {
        let base = self.target_queue_size as f64 / estimated_total.max(1) as f64;
        let p = base * Self::queue_adjustment(queue_len) * self.path_multiplier(folder);
        p.clamp(0.0, 1.0)
    }

    /// Draw an inclusion decision.
    pub fn should_include<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        folder: &str,
        estimated_total: u64,
        queue_len: usize,
    ) -> bool {
        rng.gen_bool(self.file_probability(folder, estimated_total, queue_len))
    }

    /// Pick one index from `weights` proportionally to its weight.
    ///
    /// Returns `None` when no weight is positive.
    pub fn pick_weighted<R: Rng + ?Sized>(rng: &mut R, weights: &[f64]) -> Option<usize> {
        WeightedIndex::new(weights)
            .ok()
            .map(|dist| dist.sample(rng))
    }
}

/// Running estimate of the total number of files under the root.
#[derive(Debug, Clone)]
pub struct TotalEstimator {
    configured: Option<u64>,
    estimate: u64,
    discovered_at_estimate: u64,
    locked: bool,
    growth_threshold: f64,
    in_progress_factor: f64,
    completed_factor: f64,
    inflation_ratio: f64,
    inflation_factor: f64,
}

impl TotalEstimator {
    pub fn new(config: &SamplingConfig) -> Self {
        Self {
            configured: config.estimated_total.filter(|&n| n > 0),
            estimate: config.estimated_total.unwrap_or(0).max(1),
            discovered_at_estimate: 0,
            locked: false,
            growth_threshold: config.growth_threshold,
            in_progress_factor: config.in_progress_factor,
            completed_factor: config.completed_factor,
            inflation_ratio: config.configured_inflation_ratio,
            inflation_factor: config.configured_inflation_factor,
        }
    }

    /// Current estimate without observing anything new.
    pub fn estimate(&self) -> u64 {
        self.estimate
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn uses_configured(&self) -> bool {
        self.configured.is_some()
    }

    /// Update the estimate with the latest discovered count and return it.
    pub fn observe(&mut self, discovered: u64, in_progress: bool) -> u64 {
        if let Some(configured) = self.configured {
            let far_above = configured as f64 > self.inflation_ratio * discovered as f64;
            self.estimate = if in_progress && far_above {
                (configured as f64 * self.inflation_factor).round() as u64
            } else {
                configured
            };
            return self.estimate;
        }

        if self.locked {
            return self.estimate;
        }

        let grown = discovered as f64
            > self.discovered_at_estimate as f64 * (1.0 + self.growth_threshold);
        if grown {
            let factor = if in_progress {
                self.in_progress_factor
            } else {
                self.completed_factor
            };
            self.estimate = ((discovered as f64 * factor).round() as u64).max(1);
            self.discovered_at_estimate = discovered;
            tracing::trace!(discovered, estimate = self.estimate, "Total estimate revised");
        }
        self.estimate
    }

    /// A full discovery pass finished with `discovered` files.
    pub fn complete_pass(&mut self, discovered: u64) {
        if self.configured.is_some() {
            self.observe(discovered, false);
            return;
        }
        if !self.locked {
            self.estimate = ((discovered as f64 * self.completed_factor).round() as u64).max(1);
            self.discovered_at_estimate = discovered;
            self.locked = true;
        }
    }

    /// Allow the estimate to move again (a new pass has started).
    pub fn unlock(&mut self) {
        self.locked = false;
    }
}
