//! Provider contract between the navigation controller and item sources.
//!
//! A [`Provider`] hands out one item at a time. The three implementations
//! are the weighted random [`QueueManager`], the cursor-paginated
//! [`SequentialCursorProvider`] and the trivial [`SingleItemProvider`];
//! [`build_provider`] picks one from the configured [`ProviderMode`].
//!
//! [`QueueManager`]: crate::queue::QueueManager
//! [`SequentialCursorProvider`]: crate::sequential::SequentialCursorProvider

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use slidequeue_common::paths::{file_name, media_kind_for, parent};
use slidequeue_common::{MediaItem, MediaKind, Result};

use crate::config::{EngineConfig, ProviderMode};
use crate::queue::session::ScanSession;
use crate::queue::QueueManager;
use crate::registry::SessionRegistry;
use crate::sequential::{CursorState, SequentialCursorProvider};
use crate::signal::ScanSignal;
use crate::source::MediaSource;

/// Result of asking a provider for its next item.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderStep {
    Item(MediaItem),
    /// The provider finished a cycle and restarted from its origin.
    Wrapped,
    /// Nothing to offer right now.
    Exhausted,
}

/// Result of a new-content check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RescanOutcome {
    pub changed: bool,
    pub previous_head: Option<MediaItem>,
    pub new_head: Option<MediaItem>,
    /// Items that now sort before the previous head, in order.
    pub new_items: Vec<MediaItem>,
}

impl RescanOutcome {
    pub fn unchanged() -> Self {
        Self::default()
    }
}

/// Provider state that can outlive the consumer that created it.
#[derive(Debug, Clone)]
pub enum ProviderState {
    Random(Arc<Mutex<ScanSession>>),
    Sequential(CursorState),
    Single(Option<MediaItem>),
}

impl ProviderState {
    pub fn mode(&self) -> ProviderMode {
        match self {
            Self::Random(_) => ProviderMode::Random,
            Self::Sequential(_) => ProviderMode::Sequential,
            Self::Single(_) => ProviderMode::Single,
        }
    }
}

/// Source of items for the navigation controller.
#[async_trait]
pub trait Provider: Send + Sync {
    fn mode(&self) -> ProviderMode;

    /// Prepare the provider.
    ///
    /// Returns `Ok(false)` when there is nothing to show (unreachable or
    /// empty root) and `Err` only for configuration problems.
    async fn initialize(&self) -> Result<bool>;

    async fn next(&self) -> ProviderStep;

    /// Look for content that arrived since the last cycle started.
    async fn rescan_for_new_files(&self) -> RescanOutcome;

    /// Never offer `id` again.
    async fn exclude(&self, id: &str);

    /// React to the consumer becoming visible or invisible.
    async fn on_pause_changed(&self, _paused: bool) {}

    /// Stop background work and hand back the state worth keeping.
    async fn park(&self) -> ProviderState;
}

/// Provider that serves one fixed item.
pub struct SingleItemProvider {
    source: Arc<dyn MediaSource>,
    signal: ScanSignal,
    item: Mutex<Option<MediaItem>>,
    served: Mutex<bool>,
}

impl SingleItemProvider {
    pub fn new(source: Arc<dyn MediaSource>, signal: ScanSignal, item: Option<MediaItem>) -> Self {
        Self {
            source,
            signal,
            item: Mutex::new(item),
            served: Mutex::new(false),
        }
    }

    /// Item for a root that names a single file.
    pub fn item_for(reference: &str) -> MediaItem {
        let title = file_name(reference);
        let kind = media_kind_for(title).unwrap_or(MediaKind::Image);
        MediaItem::from_listing(reference, title, kind, parent(reference))
    }
}

#[async_trait]
impl Provider for SingleItemProvider {
    fn mode(&self) -> ProviderMode {
        ProviderMode::Single
    }

    async fn initialize(&self) -> Result<bool> {
        let Some(item) = self.item.lock().clone() else {
            return Ok(false);
        };
        if self.signal.resumed().await.is_err() {
            return Ok(false);
        }
        match self.source.resolve(&item.id, Duration::from_secs(60)).await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(id = %item.id, error = %e, "Single item unavailable");
                Ok(false)
            }
        }
    }

    async fn next(&self) -> ProviderStep {
        let mut served = self.served.lock();
        match self.item.lock().clone() {
            Some(item) if !*served => {
                *served = true;
                ProviderStep::Item(item)
            }
            _ => ProviderStep::Exhausted,
        }
    }

    async fn rescan_for_new_files(&self) -> RescanOutcome {
        RescanOutcome::unchanged()
    }

    async fn exclude(&self, id: &str) {
        let mut item = self.item.lock();
        if item.as_ref().is_some_and(|i| i.id == id) {
            *item = None;
        }
    }

    async fn park(&self) -> ProviderState {
        ProviderState::Single(self.item.lock().clone())
    }
}

/// Build the provider for `config.mode`, restoring `parked` state when it
/// belongs to the same mode.
pub fn build_provider(
    config: Arc<EngineConfig>,
    source: Arc<dyn MediaSource>,
    registry: SessionRegistry,
    signal: ScanSignal,
    parked: Option<ProviderState>,
) -> Result<Arc<dyn Provider>> {
    let root = config.require_root()?.to_string();

    let parked = match parked {
        Some(state) if state.mode() != config.mode => {
            tracing::warn!(
                root = %root,
                parked = %state.mode(),
                configured = %config.mode,
                "Discarding parked state of a different mode"
            );
            None
        }
        other => other,
    };

    let provider: Arc<dyn Provider> = match (config.mode, parked) {
        (ProviderMode::Random, Some(ProviderState::Random(session))) => Arc::new(
            QueueManager::with_session(config, source, registry, signal, session),
        ),
        (ProviderMode::Random, _) => Arc::new(QueueManager::new(config, source, registry, signal)?),
        (ProviderMode::Sequential, Some(ProviderState::Sequential(state))) => {
            Arc::new(SequentialCursorProvider::with_state(config, source, signal, state)?)
        }
        (ProviderMode::Sequential, _) => {
            Arc::new(SequentialCursorProvider::new(config, source, signal)?)
        }
        (ProviderMode::Single, Some(ProviderState::Single(item))) => {
            Arc::new(SingleItemProvider::new(source, signal, item))
        }
        (ProviderMode::Single, _) => Arc::new(SingleItemProvider::new(
            source,
            signal,
            Some(SingleItemProvider::item_for(&root)),
        )),
    };
    Ok(provider)
}
