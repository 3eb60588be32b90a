//! Navigation controller: the consumer-facing side of a session.
//!
//! [`NavigationController`] owns the bounded [`NavigationWindow`], the
//! display [`History`] and the `NotFound` breaker, and pulls fresh items from
//! whichever [`Provider`] the configured mode selects. When the provider has
//! nothing new it runs a new-content check and either inserts the new head
//! items at the front or wraps the window back to its first entry.
//!
//! Dropping a controller without [`NavigationController::detach`] loses the
//! session; detaching parks it in the [`SessionRegistry`] so that
//! [`NavigationController::reattach`] can pick it up again.
//!
//! Visibility changes can arrive while the controller is busy inside
//! `initialize` or `next`, so they go through a [`PauseHandle`] that another
//! task can hold.

pub mod window;

use std::sync::Arc;
use std::time::Duration;

use slidequeue_common::{Error, MediaItem, MutationAction, Result};
use tracing::{debug, info, trace, warn};

use crate::breaker::NotFoundBreaker;
use crate::config::{EngineConfig, ProviderMode};
use crate::provider::{build_provider, Provider, ProviderStep};
use crate::registry::{ParkedSession, SessionRegistry};
use crate::signal::ScanSignal;
use crate::source::MediaSource;

pub use window::{History, NavigationSnapshot, NavigationWindow, Position};

/// Cloneable pause switch for one controller.
#[derive(Clone)]
pub struct PauseHandle {
    root: String,
    signal: ScanSignal,
    provider: Arc<dyn Provider>,
}

impl PauseHandle {
    /// Pause or resume. Repeating the current state does nothing.
    pub async fn set_paused(&self, paused: bool) {
        if !self.signal.set_paused(paused) {
            return;
        }
        info!(root = %self.root, paused, "Pause signal changed");
        self.provider.on_pause_changed(paused).await;
    }

    pub fn is_paused(&self) -> bool {
        self.signal.is_paused()
    }
}

/// Moves a consumer back and forth through a session.
pub struct NavigationController {
    config: Arc<EngineConfig>,
    root: String,
    source: Arc<dyn MediaSource>,
    registry: SessionRegistry,
    signal: ScanSignal,
    provider: Arc<dyn Provider>,
    window: NavigationWindow,
    history: History,
    breaker: NotFoundBreaker,
    initialized: bool,
    ready: bool,
}

impl NavigationController {
    /// Start a fresh session for the configured root.
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn MediaSource>,
        registry: SessionRegistry,
    ) -> Result<Self> {
        Self::assemble(Arc::new(config), source, registry, None)
    }

    /// Resume the session parked for the configured root, or start fresh
    /// when there is none.
    pub fn reattach(
        config: EngineConfig,
        source: Arc<dyn MediaSource>,
        registry: SessionRegistry,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let parked = registry.reattach(config.require_root()?);
        Self::assemble(config, source, registry, parked)
    }

    fn assemble(
        config: Arc<EngineConfig>,
        source: Arc<dyn MediaSource>,
        registry: SessionRegistry,
        parked: Option<ParkedSession>,
    ) -> Result<Self> {
        let root = config.require_root()?.to_string();
        let signal = ScanSignal::new();
        let (provider_state, navigation) = match parked {
            Some(session) => (session.provider, session.navigation),
            None => (None, None),
        };

        let provider = build_provider(
            Arc::clone(&config),
            Arc::clone(&source),
            registry.clone(),
            signal.clone(),
            provider_state,
        )?;

        let mut window = NavigationWindow::new(config.window_bound());
        let mut history = History::new(config.history_capacity());
        if let Some(snapshot) = navigation {
            window.restore(&snapshot);
            history.restore(&snapshot.history);
            debug!(root = %root, items = window.len(), index = ?window.index(), "Restored navigation window");
        }

        Ok(Self {
            breaker: NotFoundBreaker::from_config(&config.breaker),
            config,
            root,
            source,
            registry,
            signal,
            provider,
            window,
            history,
            initialized: false,
            ready: false,
        })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn mode(&self) -> ProviderMode {
        self.provider.mode()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Prepare the provider. Safe to call more than once.
    ///
    /// Returns `false` when there is nothing to show yet.
    pub async fn initialize(&mut self) -> Result<bool> {
        let provider_ready = self.provider.initialize().await?;
        self.initialized = true;
        self.ready = provider_ready || !self.window.is_empty();
        info!(
            root = %self.root,
            mode = %self.provider.mode(),
            ready = self.ready,
            "Session initialized"
        );
        Ok(self.ready)
    }

    async fn ensure_initialized(&mut self) {
        if self.initialized {
            return;
        }
        if let Err(e) = self.initialize().await {
            warn!(root = %self.root, error = %e, "Initialization failed");
        }
    }

    /// Step forward, fetching from the provider once the end of the window
    /// is reached. `None` only when there is nothing to show at all.
    pub async fn next(&mut self) -> Option<MediaItem> {
        self.ensure_initialized().await;

        if let Some(item) = self.window.advance() {
            self.history.push(&item.id);
            return Some(item);
        }

        match self.fetch_fresh().await {
            ProviderStep::Item(item) => Some(self.show_new(item)),
            ProviderStep::Wrapped => self.end_of_cycle(true).await,
            ProviderStep::Exhausted => self.end_of_cycle(false).await,
        }
    }

    /// Step back, wrapping to the last entry. Never queries the provider.
    pub fn previous(&mut self) -> Option<MediaItem> {
        let item = self.window.retreat()?;
        self.history.push(&item.id);
        Some(item)
    }

    pub fn current(&self) -> Option<&MediaItem> {
        self.window.current()
    }

    pub fn current_position(&self) -> Position {
        self.window.position()
    }

    pub fn window(&self) -> &NavigationWindow {
        &self.window
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Next provider item not already in the window.
    async fn fetch_fresh(&self) -> ProviderStep {
        let attempts = self.config.navigation.max_duplicate_retries.max(1);
        for _ in 0..attempts {
            match self.provider.next().await {
                ProviderStep::Item(item) if self.window.contains(&item.id) => {
                    trace!(id = %item.id, "Skipping item already in window");
                }
                step => return step,
            }
        }
        debug!(root = %self.root, attempts, "Provider kept returning known items");
        ProviderStep::Exhausted
    }

    fn show_new(&mut self, item: MediaItem) -> MediaItem {
        self.window.push(item.clone());
        self.history.push(&item.id);
        item
    }

    async fn end_of_cycle(&mut self, provider_wrapped: bool) -> Option<MediaItem> {
        let outcome = self.provider.rescan_for_new_files().await;

        let fresh: Vec<MediaItem> = outcome
            .new_items
            .into_iter()
            .filter(|item| !self.window.contains(&item.id))
            .collect();
        if !fresh.is_empty() {
            let added = self.window.insert_front(fresh);
            info!(root = %self.root, added, "New content inserted at the front");
            let item = self.window.current().cloned()?;
            self.history.push(&item.id);
            return Some(item);
        }

        // the window no longer holds the whole cycle, so keep pulling
        let evicted = provider_wrapped && self.window.evicted_since_wrap();
        if outcome.changed || evicted {
            if let ProviderStep::Item(item) = self.fetch_fresh().await {
                if evicted {
                    self.window.clear_evicted();
                }
                return Some(self.show_new(item));
            }
        }

        let item = self.window.wrap_to_start()?;
        debug!(root = %self.root, total = self.window.len(), "Wrapped window to start");
        self.history.push(&item.id);
        Some(item)
    }

    /// Apply `action` to the current item through the source.
    ///
    /// Every successful mutation excludes the item at the provider. Favorite
    /// toggles then replace the window entry; delete and edit take the item
    /// out of the window and the history.
    pub async fn mutate_current(&mut self, action: MutationAction) -> Result<()> {
        let Some(item) = self.window.current().cloned() else {
            return Err(Error::not_found("current item", &self.root));
        };
        self.signal.checkpoint()?;
        self.source.mutate(&item.id, action).await?;
        info!(id = %item.id, %action, "Mutation applied");

        if action.removes_from_rotation() {
            self.remove_everywhere(&item.id).await;
        } else {
            self.provider.exclude(&item.id).await;
            self.window
                .replace(item.with_favorite(action == MutationAction::Favorite));
        }
        Ok(())
    }

    /// Resolve the current item to a playable URL.
    ///
    /// Fails with [`Error::Interrupted`] while paused. A `NotFound` answer
    /// goes to [`Self::report_not_found`].
    pub async fn resolve_current(&mut self, ttl: Duration) -> Result<String> {
        let Some(item) = self.window.current().cloned() else {
            return Err(Error::not_found("current item", &self.root));
        };
        self.signal.checkpoint()?;
        match self.source.resolve(&item.id, ttl).await {
            Ok(url) => Ok(url),
            Err(e) if e.is_not_found() => {
                self.report_not_found(&item.id).await;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Handle a `NotFound` event for `id`.
    ///
    /// The id is excluded at the provider right away and stays visible in
    /// the window until the breaker trips, which removes it everywhere.
    /// Returns `true` on a trip.
    pub async fn report_not_found(&mut self, id: &str) -> bool {
        self.provider.exclude(id).await;
        if !self.breaker.record(id) {
            debug!(
                id = %id,
                pending = self.breaker.pending(id),
                tracked = self.breaker.tracked(),
                "NotFound recorded"
            );
            return false;
        }
        self.remove_everywhere(id).await;
        true
    }

    async fn remove_everywhere(&mut self, id: &str) {
        self.provider.exclude(id).await;
        self.window.remove(id);
        self.history.remove(id);
        self.breaker.forget(id);
        debug!(id = %id, total = self.window.len(), "Removed from rotation");
    }

    /// Forward a visibility change to the provider.
    pub async fn on_pause_signal_changed(&self, paused: bool) {
        self.pause_handle().set_paused(paused).await;
    }

    /// Handle for pausing from another task, e.g. while `initialize` runs.
    pub fn pause_handle(&self) -> PauseHandle {
        PauseHandle {
            root: self.root.clone(),
            signal: self.signal.clone(),
            provider: Arc::clone(&self.provider),
        }
    }

    pub fn snapshot(&self) -> NavigationSnapshot {
        let (items, index, evicted_since_wrap) = self.window.snapshot();
        NavigationSnapshot {
            items,
            index,
            history: self.history.ids().map(str::to_string).collect(),
            evicted_since_wrap,
        }
    }

    /// Stop background work and park the session for a later consumer.
    pub async fn detach(self) {
        let navigation = self.snapshot();
        let provider = self.provider.park().await;
        self.signal.cancel();
        self.registry
            .detach(&self.root, ParkedSession::new(Some(provider), Some(navigation)));
    }
}
