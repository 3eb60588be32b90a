use regex::Regex;
use serde::{Deserialize, Serialize};
use slidequeue_common::{Error, MediaFilter, OrderBy, OrderDirection};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub sampling: SamplingConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub sequential: SequentialConfig,

    #[serde(default)]
    pub navigation: NavigationConfig,

    #[serde(default)]
    pub breaker: BreakerConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,
}

/// Which provider drives the navigation window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// Weighted random sample over a folder scan.
    #[default]
    Random,
    /// Cursor-paginated ordered traversal of the remote index.
    Sequential,
    /// One fixed item.
    Single,
}

impl std::fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Random => write!(f, "random"),
            Self::Sequential => write!(f, "sequential"),
            Self::Single => write!(f, "single"),
        }
    }
}

impl std::str::FromStr for ProviderMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random" | "shuffle" => Ok(Self::Random),
            "sequential" | "ordered" => Ok(Self::Sequential),
            "single" => Ok(Self::Single),
            _ => Err(format!("Unknown provider mode: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineSection {
    /// Root folder (random/sequential) or item reference (single mode)
    #[serde(default)]
    pub root: Option<String>,

    #[serde(default)]
    pub mode: ProviderMode,

    #[serde(default)]
    pub media_filter: MediaFilter,

    /// Recursion limit below the root; unset means unlimited, 0 means root only
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Fixed RNG seed for reproducible sampling
    #[serde(default)]
    pub seed: Option<u64>,
}

/// A folder path pattern that boosts sampling weight.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PriorityPattern {
    pub pattern: String,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SamplingConfig {
    /// Number of items the pending queue aims to hold (default: 100)
    #[serde(default = "default_target_queue_size")]
    pub target_queue_size: usize,

    /// User-supplied estimate of the collection size
    #[serde(default)]
    pub estimated_total: Option<u64>,

    #[serde(default)]
    pub priority_patterns: Vec<PriorityPattern>,

    /// Relative growth of the discovered count that triggers re-estimation
    #[serde(default = "default_growth_threshold")]
    pub growth_threshold: f64,

    /// Estimate multiplier applied to the discovered count while scanning
    #[serde(default = "default_in_progress_factor")]
    pub in_progress_factor: f64,

    /// Estimate multiplier applied once a pass has completed
    #[serde(default = "default_completed_factor")]
    pub completed_factor: f64,

    /// A configured estimate this many times above the discovered count is
    /// inflated while scanning
    #[serde(default = "default_inflation_ratio")]
    pub configured_inflation_ratio: f64,

    #[serde(default = "default_in_progress_factor")]
    pub configured_inflation_factor: f64,
}

fn default_target_queue_size() -> usize {
    100
}
fn default_growth_threshold() -> f64 {
    0.2
}
fn default_in_progress_factor() -> f64 {
    3.0
}
fn default_completed_factor() -> f64 {
    1.2
}
fn default_inflation_ratio() -> f64 {
    20.0
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            target_queue_size: default_target_queue_size(),
            estimated_total: None,
            priority_patterns: Vec::new(),
            growth_threshold: default_growth_threshold(),
            in_progress_factor: default_in_progress_factor(),
            completed_factor: default_completed_factor(),
            configured_inflation_ratio: default_inflation_ratio(),
            configured_inflation_factor: default_in_progress_factor(),
        }
    }
}

/// How refill candidates are ordered in random mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueOrder {
    #[default]
    Shuffled,
    /// Folder-mode sequential fallback: sort by the configured order key
    Sorted,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    pub order: QueueOrder,
    pub order_by: OrderBy,
    pub order_direction: OrderDirection,
    pub refill_floor: usize,
    pub refill_history_margin: usize,
    pub refill_min_batch: usize,
    pub shuffle_min: usize,
    pub shuffle_max: usize,
    pub shuffle_fraction: f64,
    /// Fraction of the seen-set (most recent first) kept on age-out
    pub age_out_keep: f64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            order: QueueOrder::Shuffled,
            order_by: OrderBy::DateTaken,
            order_direction: OrderDirection::Asc,
            refill_floor: 25,
            refill_history_margin: 15,
            refill_min_batch: 10,
            shuffle_min: 10,
            shuffle_max: 1000,
            shuffle_fraction: 0.1,
            age_out_keep: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SequentialConfig {
    pub page_size: usize,
    /// Buffer size below which the next page is fetched
    pub low_water: usize,
    pub recursive: bool,
    pub order_by: OrderBy,
    pub order_direction: OrderDirection,
    pub auto_loop: bool,
    pub filters: Vec<String>,
}

impl Default for SequentialConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            low_water: 10,
            recursive: true,
            order_by: OrderBy::DateTaken,
            order_direction: OrderDirection::Asc,
            auto_loop: true,
            filters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Target number of items kept navigable; the window holds twice this
    pub window_size: usize,
    pub max_duplicate_retries: usize,
    pub advance_interval_secs: u64,
    pub discovery_window_secs: u64,
    pub history_floor: usize,
    pub history_cap: usize,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            max_duplicate_retries: 10,
            advance_interval_secs: 10,
            discovery_window_secs: 3600,
            history_floor: 100,
            history_cap: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    pub threshold: usize,
    pub window_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            threshold: 3,
            window_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub browse_timeout_secs: u64,
    /// Sibling folders listed concurrently in random order
    pub batch_size: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            browse_timeout_secs: 180,
            batch_size: 2,
        }
    }
}

/// A compiled priority pattern.
#[derive(Debug, Clone)]
pub struct PriorityRule {
    pub regex: Regex,
    pub multiplier: f64,
}

/// Immutable engine configuration with every default applied.
///
/// Built once by [`Config::resolve`] and shared behind an `Arc` by every
/// component of a session.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub root: Option<String>,
    pub mode: ProviderMode,
    pub media_filter: MediaFilter,
    pub max_depth: Option<u32>,
    pub seed: Option<u64>,
    pub sampling: SamplingConfig,
    pub queue: QueueConfig,
    pub sequential: SequentialConfig,
    pub navigation: NavigationConfig,
    pub breaker: BreakerConfig,
    pub scanner: ScannerConfig,
    pub priority: Vec<PriorityRule>,
}

impl EngineConfig {
    /// Maximum number of items the navigation window holds.
    pub fn window_bound(&self) -> usize {
        (self.navigation.window_size * 2).max(1)
    }

    /// Capacity of the navigation history:
    /// `max(5 × window, discovery window / advance interval, floor)`, capped.
    pub fn history_capacity(&self) -> usize {
        let nav = &self.navigation;
        let by_time = if nav.advance_interval_secs > 0 {
            (nav.discovery_window_secs / nav.advance_interval_secs) as usize
        } else {
            0
        };
        (nav.window_size * 5)
            .max(by_time)
            .max(nav.history_floor)
            .min(nav.history_cap)
    }

    /// Root path, or a configuration error when none was given.
    pub fn require_root(&self) -> slidequeue_common::Result<&str> {
        match self.root.as_deref().map(str::trim) {
            Some(root) if !root.is_empty() => Ok(root),
            _ => Err(Error::configuration("no root path configured")),
        }
    }
}

impl Config {
    /// Start from defaults with a root and mode filled in.
    pub fn for_root(root: impl Into<String>, mode: ProviderMode) -> Self {
        let mut config = Self::default();
        config.engine.root = Some(root.into());
        config.engine.mode = mode;
        config
    }

    /// Apply defaults and compile patterns into an [`EngineConfig`].
    pub fn resolve(&self) -> slidequeue_common::Result<EngineConfig> {
        let mut priority = Vec::with_capacity(self.sampling.priority_patterns.len());
        for p in &self.sampling.priority_patterns {
            let regex = Regex::new(&p.pattern).map_err(|e| {
                Error::configuration(format!("invalid priority pattern '{}': {e}", p.pattern))
            })?;
            if !(p.multiplier.is_finite() && p.multiplier > 0.0) {
                return Err(Error::configuration(format!(
                    "priority pattern '{}' has non-positive multiplier {}",
                    p.pattern, p.multiplier
                )));
            }
            priority.push(PriorityRule {
                regex,
                multiplier: p.multiplier,
            });
        }

        if self.sampling.target_queue_size == 0 {
            return Err(Error::configuration("sampling.target_queue_size must be > 0"));
        }
        if self.sequential.page_size == 0 {
            return Err(Error::configuration("sequential.page_size must be > 0"));
        }

        let mut scanner = self.scanner.clone();
        scanner.batch_size = scanner.batch_size.max(1);

        let mut queue = self.queue.clone();
        queue.age_out_keep = queue.age_out_keep.clamp(0.0, 1.0);

        Ok(EngineConfig {
            root: self
                .engine
                .root
                .as_ref()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            mode: self.engine.mode,
            media_filter: self.engine.media_filter,
            max_depth: self.engine.max_depth,
            seed: self.engine.seed,
            sampling: self.sampling.clone(),
            queue,
            sequential: self.sequential.clone(),
            navigation: self.navigation.clone(),
            breaker: self.breaker.clone(),
            scanner,
            priority,
        })
    }
}
