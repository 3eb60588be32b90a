//! Sequential-mode provider.
//!
//! [`SequentialCursorProvider`] walks the remote ordered index page by page
//! with a cursor, keeping a small lookahead buffer. When a cycle ends it
//! wraps back to the origin (unless auto-loop is off) and the controller
//! runs a new-content check against the head of the index.
//!
//! Every index query is preceded by a [`ScanSignal`] checkpoint. While the
//! consumer is paused or gone no query is sent and the cursor stays put.

pub mod cursor;

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use slidequeue_common::{Error, MediaItem, Result};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, ProviderMode};
use crate::provider::{Provider, ProviderState, ProviderStep, RescanOutcome};
use crate::signal::ScanSignal;
use crate::source::ordering::sort_items;
use crate::source::{MediaSource, OrderedPage, OrderedQuery, SortKey};

pub use cursor::CursorState;

/// Cursor-paginated ordered traversal.
pub struct SequentialCursorProvider {
    config: Arc<EngineConfig>,
    source: Arc<dyn MediaSource>,
    root: String,
    query_timeout: Duration,
    signal: ScanSignal,
    state: Mutex<CursorState>,
}

impl SequentialCursorProvider {
    pub fn new(
        config: Arc<EngineConfig>,
        source: Arc<dyn MediaSource>,
        signal: ScanSignal,
    ) -> Result<Self> {
        let state = CursorState::new(config.sequential.auto_loop);
        Self::with_state(config, source, signal, state)
    }

    /// Resume from a parked cursor.
    pub fn with_state(
        config: Arc<EngineConfig>,
        source: Arc<dyn MediaSource>,
        signal: ScanSignal,
        state: CursorState,
    ) -> Result<Self> {
        let root = config.require_root()?.to_string();
        Ok(Self {
            query_timeout: Duration::from_secs(config.scanner.browse_timeout_secs),
            config,
            source,
            root,
            signal,
            state: Mutex::new(state),
        })
    }

    pub async fn snapshot(&self) -> CursorState {
        self.state.lock().await.clone()
    }

    /// Drop the buffer and start over from the origin.
    pub async fn refresh(&self) {
        self.state.lock().await.reset_to_origin();
    }

    fn query(&self, after: Option<SortKey>) -> OrderedQuery {
        let seq = &self.config.sequential;
        OrderedQuery {
            count: seq.page_size,
            folder: self.root.clone(),
            recursive: seq.recursive,
            order_by: seq.order_by,
            order_direction: seq.order_direction,
            after,
            filters: seq.filters.clone(),
            media_filter: self.config.media_filter,
        }
    }

    async fn run_query(&self, query: &OrderedQuery) -> Result<OrderedPage> {
        self.signal.checkpoint()?;
        tokio::time::timeout(self.query_timeout, self.source.query_ordered(query))
            .await
            .map_err(|_| Error::timeout("query_ordered", self.query_timeout.as_secs()))?
    }

    async fn fetch_page(&self, state: &mut CursorState) -> Result<usize> {
        let query = self.query(state.cursor.clone());
        let page = self.run_query(&query).await?;
        let seq = &self.config.sequential;
        let added = state.accept_page(page, seq.page_size, seq.order_by, seq.order_direction);
        debug!(root = %self.root, added, has_more = state.has_more, "Fetched index page");
        Ok(added)
    }

    /// Page through the whole index with auto-loop off.
    ///
    /// Returns the full ordered list when it holds at most `limit` items,
    /// `None` when it is larger. The live cursor is not touched.
    pub async fn probe_small_collection(&self, limit: usize) -> Result<Option<Vec<MediaItem>>> {
        let seq = &self.config.sequential;
        let excluded = self.state.lock().await.excluded.clone();
        let mut probe = CursorState::new(false);
        probe.excluded = excluded;

        let mut items = Vec::new();
        loop {
            self.fetch_page(&mut probe).await?;
            items.extend(probe.buffer.drain(..));
            if items.len() > limit {
                debug!(root = %self.root, limit, "Collection too large to preload");
                return Ok(None);
            }
            if !probe.has_more {
                break;
            }
        }
        sort_items(&mut items, seq.order_by, seq.order_direction);
        Ok(Some(items))
    }
}

#[async_trait]
impl Provider for SequentialCursorProvider {
    fn mode(&self) -> ProviderMode {
        ProviderMode::Sequential
    }

    async fn initialize(&self) -> Result<bool> {
        if !self.state.lock().await.buffer.is_empty() {
            return Ok(true);
        }
        if self.signal.resumed().await.is_err() {
            debug!(root = %self.root, "Cancelled before the first page");
            return Ok(false);
        }

        let mut state = self.state.lock().await;
        if !state.at_origin() && !state.has_more {
            // parked at the end of a cycle
            state.reset_to_origin();
        }
        match self.fetch_page(&mut state).await {
            Ok(_) => Ok(!state.buffer.is_empty()),
            Err(e) => {
                warn!(root = %self.root, error = %e, "Index query failed");
                Ok(false)
            }
        }
    }

    async fn next(&self) -> ProviderStep {
        let low_water = self.config.sequential.low_water.max(1);
        let mut state = self.state.lock().await;

        loop {
            if state.needs_fill(low_water) {
                if let Err(e) = self.fetch_page(&mut state).await {
                    if e.is_interrupted() {
                        debug!(root = %self.root, error = %e, "Index query skipped");
                    } else {
                        warn!(root = %self.root, error = %e, "Index query failed");
                    }
                    if state.buffer.is_empty() {
                        return ProviderStep::Exhausted;
                    }
                }
            }
            if let Some(item) = state.pop() {
                return ProviderStep::Item(item);
            }
            if !state.has_more {
                break;
            }
        }

        if !state.auto_loop || state.at_origin() {
            return ProviderStep::Exhausted;
        }
        info!(root = %self.root, "Reached end of index, wrapping to origin");
        state.reset_to_origin();
        ProviderStep::Wrapped
    }

    async fn rescan_for_new_files(&self) -> RescanOutcome {
        let seq = &self.config.sequential;
        let mut state = self.state.lock().await;
        let page = match self.run_query(&self.query(None)).await {
            Ok(page) => page,
            Err(e) if e.is_interrupted() => {
                debug!(root = %self.root, error = %e, "New-content check skipped");
                return RescanOutcome::unchanged();
            }
            Err(e) => {
                warn!(root = %self.root, error = %e, "New-content check failed");
                return RescanOutcome::unchanged();
            }
        };

        let mut items: Vec<MediaItem> = page
            .items
            .into_iter()
            .filter(|item| !state.excluded.contains(&item.id))
            .collect();
        sort_items(&mut items, seq.order_by, seq.order_direction);

        let previous_head = state.head.clone();
        let new_head = items.first().cloned();
        let changed = match (&previous_head, &new_head) {
            (Some(old), Some(new)) => {
                old.id != new.id || old.date_for(seq.order_by) != new.date_for(seq.order_by)
            }
            (None, None) => false,
            _ => true,
        };

        let new_items = match &previous_head {
            Some(old) if changed => {
                let old_key = SortKey::of(old, seq.order_by);
                items
                    .iter()
                    .take_while(|item| {
                        item.id != old.id
                            && SortKey::of(item, seq.order_by).compare(
                                &old_key,
                                seq.order_by,
                                seq.order_direction,
                            ) == Ordering::Less
                    })
                    .cloned()
                    .collect()
            }
            _ => Vec::new(),
        };

        if changed {
            info!(
                root = %self.root,
                new_items = new_items.len(),
                "Head of index changed"
            );
            state.head = new_head.clone();
        }

        RescanOutcome {
            changed,
            previous_head,
            new_head,
            new_items,
        }
    }

    async fn exclude(&self, id: &str) {
        self.state.lock().await.exclude(id);
    }

    async fn park(&self) -> ProviderState {
        ProviderState::Sequential(self.snapshot().await)
    }
}
