//! Random-mode provider.
//!
//! [`QueueManager`] owns a [`ScanSession`]: it runs discovery passes through
//! the [`FolderScanner`], serves items from the sampled pending queue,
//! refills from already discovered folders and ages out the seen-set once
//! everything has been shown. A session paused mid-scan parks itself in
//! the [`SessionRegistry`] and continues its pass on resume. An initial pass
//! paused before any media was found waits for the resume instead of
//! reporting an empty root.

pub mod session;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use slidequeue_common::{Interrupt, MediaItem, Result};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, ProviderMode};
use crate::provider::{Provider, ProviderState, ProviderStep, RescanOutcome};
use crate::registry::SessionRegistry;
use crate::scanner::{FolderScanner, ScanOutcome, WeightedSampler};
use crate::signal::ScanSignal;
use crate::source::MediaSource;

pub use session::{FolderNode, QueueStats, ScanSession, ScanState};

struct QueueInner {
    config: Arc<EngineConfig>,
    root: String,
    session: Arc<Mutex<ScanSession>>,
    scanner: FolderScanner,
    registry: SessionRegistry,
    signal: ScanSignal,
}

impl QueueInner {
    /// Run (or continue) one discovery pass and settle the session state.
    async fn run_scan(&self) -> Result<ScanOutcome> {
        {
            let mut session = self.session.lock();
            if session.state() == ScanState::Paused && self.registry.reclaim_provider(&self.root) {
                debug!(root = %self.root, "Reclaimed paused scan from registry");
            }
            session.begin_pass();
        }
        let outcome = self
            .scanner
            .scan(&self.session, &self.root, self.config.max_depth, &self.signal)
            .await;

        match &outcome {
            Ok(ScanOutcome::Completed(result)) => {
                let mut session = self.session.lock();
                session.complete_pass();
                info!(
                    root = %self.root,
                    files_added = result.files_added,
                    estimated_total = session.estimate(),
                    "Discovery pass completed"
                );
            }
            Ok(ScanOutcome::Interrupted(Interrupt::Paused, _)) => {
                self.session.lock().set_state(ScanState::Paused);
                let state = ProviderState::Random(Arc::clone(&self.session));
                if self.registry.park_provider(&self.root, state) {
                    debug!(root = %self.root, "Paused scan parked in registry");
                }
            }
            Ok(ScanOutcome::Interrupted(Interrupt::Cancelled, _)) => {
                self.session.lock().set_state(ScanState::Cancelled);
            }
            Err(_) => {
                self.session.lock().set_state(ScanState::Idle);
            }
        }
        outcome
    }

    fn refill_cap(&self) -> usize {
        self.config.navigation.window_size.max(1)
    }
}

/// Weighted random provider over a folder scan.
pub struct QueueManager {
    inner: Arc<QueueInner>,
    scan_task: Mutex<Option<JoinHandle<()>>>,
    /// Set while `initialize` drives the pass itself.
    initializing: AtomicBool,
}

impl QueueManager {
    /// Create a manager with a fresh session.
    pub fn new(
        config: Arc<EngineConfig>,
        source: Arc<dyn MediaSource>,
        registry: SessionRegistry,
        signal: ScanSignal,
    ) -> Result<Self> {
        let root = config.require_root()?;
        let session = Arc::new(Mutex::new(ScanSession::new(root, &config)));
        Ok(Self::with_session(config, source, registry, signal, session))
    }

    /// Create a manager around an existing (parked) session.
    pub fn with_session(
        config: Arc<EngineConfig>,
        source: Arc<dyn MediaSource>,
        registry: SessionRegistry,
        signal: ScanSignal,
        session: Arc<Mutex<ScanSession>>,
    ) -> Self {
        let sampler = Arc::new(WeightedSampler::from_config(&config));
        let scanner = FolderScanner::new(source, sampler, &config);
        let root = session.lock().root().to_string();
        Self {
            inner: Arc::new(QueueInner {
                config,
                root,
                session,
                scanner,
                registry,
                signal,
            }),
            scan_task: Mutex::new(None),
            initializing: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> Arc<Mutex<ScanSession>> {
        Arc::clone(&self.inner.session)
    }

    pub fn stats(&self) -> QueueStats {
        self.inner.session.lock().stats()
    }

    /// Scan the root unless the session already holds a queue.
    ///
    /// Returns `Ok(false)` when the root cannot be listed or holds no media.
    /// A pause that hits before the first file is found is waited out; a
    /// pause after that returns what was sampled so far and the pass
    /// continues in the background once resumed.
    pub async fn initialize(&self) -> Result<bool> {
        let (has_queue, interrupted) = {
            let session = self.inner.session.lock();
            (session.has_queue(), session.state().is_interrupted())
        };
        if has_queue {
            if interrupted && !self.inner.signal.is_paused() {
                self.spawn_scan();
            }
            return Ok(true);
        }

        self.initializing.store(true, Ordering::SeqCst);
        let ready = self.initial_scan().await;
        self.initializing.store(false, Ordering::SeqCst);

        // a resume that arrived while the pass was ours is picked up here
        let paused_pass = self.inner.session.lock().state() == ScanState::Paused;
        if paused_pass && !self.inner.signal.is_paused() {
            self.spawn_scan();
        }
        ready
    }

    async fn initial_scan(&self) -> Result<bool> {
        loop {
            let outcome = match self.inner.run_scan().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(root = %self.inner.root, error = %e, "Root unavailable");
                    return Ok(false);
                }
            };
            let nothing_found = self.inner.session.lock().known_len() == 0;
            match outcome {
                ScanOutcome::Interrupted(Interrupt::Paused, _) if nothing_found => {
                    debug!(root = %self.inner.root, "Initial scan paused, waiting for resume");
                    if self.inner.signal.resumed().await.is_err() {
                        return Ok(false);
                    }
                }
                ScanOutcome::Interrupted(Interrupt::Cancelled, _) if nothing_found => {
                    debug!(root = %self.inner.root, "Initial scan cancelled");
                    return Ok(false);
                }
                outcome => {
                    debug!(root = %self.inner.root, ?outcome, "Initial scan finished");
                    break;
                }
            }
        }

        let mut session = self.inner.session.lock();
        if session.known_len() == 0 {
            info!(root = %self.inner.root, "No media found under root");
            return Ok(false);
        }
        if session.pending_len() == 0 {
            session.refill(self.inner.refill_cap());
        }
        session.reorder();
        Ok(session.pending_len() > 0)
    }

    /// Serve the next unseen item.
    pub fn get_next(&self) -> Option<MediaItem> {
        let cap = self.inner.refill_cap();
        let keep = self.inner.config.queue.age_out_keep;
        let mut session = self.inner.session.lock();

        if let Some(item) = session.take_next() {
            if session.needs_refill() {
                session.refill(cap);
            }
            return Some(item);
        }

        if session.refill(cap) > 0 {
            if let Some(item) = session.take_next() {
                return Some(item);
            }
        }

        session.age_out(keep);
        session.refill(cap);
        session.take_next()
    }

    /// Top up the pending queue from discovered folders.
    pub fn refill_queue(&self) -> usize {
        let cap = self.inner.refill_cap();
        self.inner.session.lock().refill(cap)
    }

    /// Continue (or start) a pass in the background.
    fn spawn_scan(&self) {
        let mut task = self.scan_task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        *task = Some(tokio::spawn(async move {
            if let Err(e) = inner.run_scan().await {
                warn!(root = %inner.root, error = %e, "Background scan failed");
            }
        }));
    }

    fn stop_scan(&self) {
        if let Some(handle) = self.scan_task.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for QueueManager {
    fn drop(&mut self) {
        self.stop_scan();
    }
}

#[async_trait]
impl Provider for QueueManager {
    fn mode(&self) -> ProviderMode {
        ProviderMode::Random
    }

    async fn initialize(&self) -> Result<bool> {
        QueueManager::initialize(self).await
    }

    async fn next(&self) -> ProviderStep {
        match self.get_next() {
            Some(item) => ProviderStep::Item(item),
            None => ProviderStep::Exhausted,
        }
    }

    async fn rescan_for_new_files(&self) -> RescanOutcome {
        if let Err(interrupt) = self.inner.signal.checkpoint() {
            debug!(root = %self.inner.root, %interrupt, "Rescan skipped");
            return RescanOutcome::unchanged();
        }
        let state = self.inner.session.lock().state();
        match state {
            ScanState::Completed | ScanState::Idle => {}
            ScanState::Paused | ScanState::Cancelled => {
                self.spawn_scan();
                return RescanOutcome::unchanged();
            }
            ScanState::Scanning => return RescanOutcome::unchanged(),
        }

        match self.inner.run_scan().await {
            Ok(outcome) => {
                let added = outcome.result().files_added;
                if added > 0 {
                    info!(root = %self.inner.root, added, "New files discovered on rescan");
                    self.refill_queue();
                }
                RescanOutcome {
                    changed: added > 0,
                    ..RescanOutcome::default()
                }
            }
            Err(e) => {
                warn!(root = %self.inner.root, error = %e, "Rescan failed");
                RescanOutcome::unchanged()
            }
        }
    }

    async fn exclude(&self, id: &str) {
        self.inner.session.lock().exclude(id);
    }

    async fn on_pause_changed(&self, paused: bool) {
        if paused {
            return;
        }
        let state = self.inner.session.lock().state();
        if state == ScanState::Paused && !self.initializing.load(Ordering::SeqCst) {
            debug!(root = %self.inner.root, "Resuming paused scan");
            self.spawn_scan();
        }
    }

    async fn park(&self) -> ProviderState {
        self.inner.signal.cancel();
        self.stop_scan();
        {
            let mut session = self.inner.session.lock();
            if session.state() == ScanState::Scanning {
                session.set_state(ScanState::Cancelled);
            }
        }
        ProviderState::Random(Arc::clone(&self.inner.session))
    }
}
