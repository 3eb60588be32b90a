//! Mutable state of one random-mode scan session.
//!
//! A [`ScanSession`] is shared between the scanner (which records folders and
//! samples newly discovered files into it) and the [`QueueManager`] (which
//! serves, refills and ages out). It always lives behind a
//! `parking_lot::Mutex` and every method is synchronous, so the lock is never
//! held across an `.await`.
//!
//! [`QueueManager`]: super::QueueManager

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use slidequeue_common::MediaItem;

use crate::config::{EngineConfig, QueueConfig, QueueOrder};
use crate::scanner::{TotalEstimator, WeightedSampler};
use crate::source::ordering::sort_items;

/// Lifecycle of a scan session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    #[default]
    Idle,
    Scanning,
    Paused,
    Completed,
    Cancelled,
}

impl ScanState {
    /// Whether an interrupted pass is waiting to be continued.
    pub fn is_interrupted(self) -> bool {
        matches!(self, Self::Paused | Self::Cancelled)
    }
}

/// One listed folder.
#[derive(Debug, Clone)]
pub struct FolderNode {
    pub path: String,
    pub depth: u32,
    pub files: Vec<MediaItem>,
    pub subfolders: Vec<String>,
    pub weight: f64,
    /// Scan pass that produced this listing.
    pub pass: u64,
}

/// Snapshot of session counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueStats {
    pub state: ScanState,
    pub pending: usize,
    pub seen: usize,
    pub known: usize,
    pub folders: usize,
    pub excluded: usize,
    pub estimated_total: u64,
    pub pass: u64,
}

/// Pending/seen queue plus everything discovered so far.
#[derive(Debug)]
pub struct ScanSession {
    root: String,
    queue: QueueConfig,
    target_queue_size: usize,
    pending: VecDeque<MediaItem>,
    pending_ids: HashSet<String>,
    seen: HashSet<String>,
    seen_order: VecDeque<String>,
    known: HashSet<String>,
    folders: BTreeMap<String, FolderNode>,
    estimator: TotalEstimator,
    state: ScanState,
    discovery_started: Option<Instant>,
    excluded: HashSet<String>,
    added_since_shuffle: usize,
    history: VecDeque<String>,
    history_capacity: usize,
    rng: StdRng,
    pass: u64,
}

impl ScanSession {
    pub fn new(root: impl Into<String>, config: &EngineConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            root: root.into(),
            queue: config.queue.clone(),
            target_queue_size: config.sampling.target_queue_size.max(1),
            pending: VecDeque::new(),
            pending_ids: HashSet::new(),
            seen: HashSet::new(),
            seen_order: VecDeque::new(),
            known: HashSet::new(),
            folders: BTreeMap::new(),
            estimator: TotalEstimator::new(&config.sampling),
            state: ScanState::Idle,
            discovery_started: None,
            excluded: HashSet::new(),
            added_since_shuffle: 0,
            history: VecDeque::new(),
            history_capacity: config.history_capacity(),
            rng,
            pass: 0,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn set_state(&mut self, state: ScanState) {
        if self.state != state {
            tracing::debug!(root = %self.root, from = ?self.state, to = ?state, "Scan state changed");
            self.state = state;
        }
    }

    pub fn discovery_started(&self) -> Option<Instant> {
        self.discovery_started
    }

    pub fn pass(&self) -> u64 {
        self.pass
    }

    /// Whether anything has ever been queued or served.
    pub fn has_queue(&self) -> bool {
        !self.pending.is_empty() || !self.seen.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    pub fn known_len(&self) -> usize {
        self.known.len()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn estimate(&self) -> u64 {
        self.estimator.estimate()
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Ids currently pending, in queue order.
    pub fn pending_ids(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(|item| item.id.as_str())
    }

    pub fn is_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending_ids.contains(id)
    }

    pub fn is_excluded(&self, id: &str) -> bool {
        self.excluded.contains(id)
    }

    pub fn folder(&self, path: &str) -> Option<&FolderNode> {
        self.folders.get(path)
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    // -----------------------------------------------------------------------
    // Scan passes
    // -----------------------------------------------------------------------

    /// Start a discovery pass, or continue the one that was interrupted.
    pub fn begin_pass(&mut self) {
        if !self.state.is_interrupted() || self.pass == 0 {
            self.pass += 1;
            self.estimator.unlock();
        }
        if self.discovery_started.is_none() {
            self.discovery_started = Some(Instant::now());
        }
        self.set_state(ScanState::Scanning);
    }

    /// The current pass ran to the end.
    pub fn complete_pass(&mut self) {
        self.estimator.complete_pass(self.known.len() as u64);
        self.set_state(ScanState::Completed);
    }

    /// Listing recorded earlier in the current pass, reused on resume.
    pub fn reusable_listing(&self, path: &str) -> Option<&FolderNode> {
        self.folders.get(path).filter(|node| node.pass == self.pass)
    }

    /// Record a folder listing, replacing any earlier one for the same path.
    pub fn record_folder(&mut self, node: FolderNode) {
        self.folders.insert(node.path.clone(), node);
    }

    /// Register a discovered file. Returns `true` if it was not known yet.
    pub fn register(&mut self, item: &MediaItem) -> bool {
        self.known.insert(item.id.clone())
    }

    /// Offer a newly discovered file to the pending queue.
    ///
    /// Returns `true` if the sampler admitted it.
    pub fn sample(&mut self, sampler: &WeightedSampler, item: MediaItem) -> bool {
        if self.pending.len() >= self.target_queue_size {
            return false;
        }
        let in_progress = self.state == ScanState::Scanning;
        let estimate = self.estimator.observe(self.known.len() as u64, in_progress);
        let queue_len = self.pending.len();
        if !sampler.should_include(&mut self.rng, &item.folder, estimate, queue_len) {
            return false;
        }
        let admitted = self.push_pending(item);
        if admitted {
            self.maybe_shuffle();
        }
        admitted
    }

    // -----------------------------------------------------------------------
    // Queue
    // -----------------------------------------------------------------------

    /// Append to the pending queue unless the id is pending, seen or excluded.
    pub fn push_pending(&mut self, item: MediaItem) -> bool {
        if self.pending_ids.contains(&item.id)
            || self.seen.contains(&item.id)
            || self.excluded.contains(&item.id)
        {
            return false;
        }
        self.pending_ids.insert(item.id.clone());
        self.pending.push_back(item);
        self.added_since_shuffle += 1;
        true
    }

    fn shuffle_threshold(&self) -> usize {
        let q = &self.queue;
        let scaled = (self.pending.len() as f64 * q.shuffle_fraction) as usize;
        scaled.clamp(q.shuffle_min, q.shuffle_max.max(q.shuffle_min))
    }

    /// Reorder once enough items arrived since the last reorder.
    pub fn maybe_shuffle(&mut self) -> bool {
        if self.added_since_shuffle >= self.shuffle_threshold() {
            self.reorder();
            true
        } else {
            false
        }
    }

    /// Full Fisher-Yates shuffle of the pending queue (or a sort, for the
    /// sorted fallback order).
    pub fn reorder(&mut self) {
        match self.queue.order {
            QueueOrder::Shuffled => self.pending.make_contiguous().shuffle(&mut self.rng),
            QueueOrder::Sorted => sort_items(
                self.pending.make_contiguous(),
                self.queue.order_by,
                self.queue.order_direction,
            ),
        }
        self.added_since_shuffle = 0;
    }

    /// Serve the first pending item that has not been seen.
    pub fn take_next(&mut self) -> Option<MediaItem> {
        while let Some(item) = self.pending.pop_front() {
            self.pending_ids.remove(&item.id);
            if self.seen.contains(&item.id) || self.excluded.contains(&item.id) {
                continue;
            }
            self.mark_seen(&item.id);
            return Some(item);
        }
        None
    }

    fn mark_seen(&mut self, id: &str) {
        self.seen.insert(id.to_string());
        self.seen_order.push_back(id.to_string());
        self.history.push_back(id.to_string());
        while self.history.len() > self.history_capacity {
            self.history.pop_front();
        }
    }

    /// Refill threshold: `max(history + margin, floor)`.
    pub fn refill_threshold(&self) -> usize {
        (self.history.len() + self.queue.refill_history_margin).max(self.queue.refill_floor)
    }

    /// Whether the unseen count dropped below the refill threshold.
    pub fn needs_refill(&self) -> bool {
        self.pending.len() < self.refill_threshold()
    }

    /// Pull candidates from discovered folders into the pending queue.
    ///
    /// Folders are picked by weight; files inside a folder uniformly. At
    /// most `cap` items are added. Returns the number added.
    pub fn refill(&mut self, cap: usize) -> usize {
        let threshold = self.refill_threshold();
        let current = self.pending.len();
        if current >= threshold {
            return 0;
        }
        let wanted = (2 * threshold)
            .saturating_sub(current)
            .max(self.queue.refill_min_batch)
            .min(cap.max(1));

        let mut buckets: Vec<(f64, Vec<MediaItem>)> = self
            .folders
            .values()
            .filter_map(|node| {
                let eligible: Vec<MediaItem> = node
                    .files
                    .iter()
                    .filter(|f| {
                        !self.pending_ids.contains(&f.id)
                            && !self.seen.contains(&f.id)
                            && !self.excluded.contains(&f.id)
                    })
                    .cloned()
                    .collect();
                if eligible.is_empty() {
                    None
                } else {
                    // zero-weight folders still get a small chance
                    Some((node.weight.max(f64::MIN_POSITIVE), eligible))
                }
            })
            .collect();

        let mut batch = Vec::with_capacity(wanted);
        while batch.len() < wanted {
            let weights: Vec<f64> = buckets.iter().map(|(w, _)| *w).collect();
            let Some(idx) = WeightedSampler::pick_weighted(&mut self.rng, &weights) else {
                break;
            };
            let files = &mut buckets[idx].1;
            let pick = self.rng.gen_range(0..files.len());
            batch.push(files.swap_remove(pick));
            if files.is_empty() {
                buckets.swap_remove(idx);
            }
        }

        match self.queue.order {
            QueueOrder::Shuffled => batch.shuffle(&mut self.rng),
            QueueOrder::Sorted => sort_items(&mut batch, self.queue.order_by, self.queue.order_direction),
        }

        let mut added = 0;
        for item in batch {
            if self.push_pending(item) {
                added += 1;
            }
        }
        if added > 0 {
            self.maybe_shuffle();
            tracing::debug!(root = %self.root, added, pending = self.pending.len(), "Queue refilled");
        }
        added
    }

    /// Forget all but the most recently seen fraction of the seen-set.
    pub fn age_out(&mut self, keep_fraction: f64) -> usize {
        let keep = (self.seen_order.len() as f64 * keep_fraction.clamp(0.0, 1.0)).floor() as usize;
        let drop = self.seen_order.len() - keep;
        for id in self.seen_order.drain(..drop) {
            self.seen.remove(&id);
        }
        if drop > 0 {
            tracing::debug!(root = %self.root, dropped = drop, kept = keep, "Seen-set aged out");
        }
        drop
    }

    /// Never offer `id` again.
    pub fn exclude(&mut self, id: &str) {
        self.excluded.insert(id.to_string());
        if self.pending_ids.remove(id) {
            self.pending.retain(|item| item.id != id);
        }
        self.history.retain(|h| h != id);
    }

    /// Ids of every file discovered so far.
    pub fn known_ids(&self) -> &HashSet<String> {
        &self.known
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            state: self.state,
            pending: self.pending.len(),
            seen: self.seen.len(),
            known: self.known.len(),
            folders: self.folders.len(),
            excluded: self.excluded.len(),
            estimated_total: self.estimator.estimate(),
            pass: self.pass,
        }
    }
}
