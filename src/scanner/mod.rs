//! Folder discovery.
//!
//! This module walks a [`MediaSource`] folder tree, records every listed
//! folder in a [`ScanSession`] and lets the [`WeightedSampler`] decide which
//! newly discovered files enter the pending queue.
//!
//! Sub-folders are visited in batches whose members run concurrently and
//! settle independently: one failing branch never aborts its siblings. The
//! pause/cancel signal is checked before every listing call.

pub mod sampler;

use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use serde::Serialize;
use slidequeue_common::paths::ChronoKey;
use slidequeue_common::{Error, Interrupt, MediaFilter, MediaItem, Result};
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, QueueOrder};
use crate::queue::session::{FolderNode, ScanSession};
use crate::signal::ScanSignal;
use crate::source::MediaSource;

pub use sampler::{TotalEstimator, WeightedSampler};

/// Counters for one `scan` invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    /// Media files listed (including ones already known).
    pub files_seen: usize,
    /// Files that were not known to the session before this scan.
    pub files_added: usize,
    pub folders_visited: usize,
    /// Sub-folders whose listing failed or timed out.
    pub folders_failed: usize,
}

/// How a scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Every reachable folder was visited.
    Completed(ScanResult),
    /// The signal stopped the scan; what was found so far is kept.
    Interrupted(Interrupt, ScanResult),
}

impl ScanOutcome {
    pub fn result(&self) -> ScanResult {
        match self {
            Self::Completed(result) | Self::Interrupted(_, result) => *result,
        }
    }
}

/// Order in which siblings are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOrder {
    /// Shuffle siblings, then visit them in concurrent batches.
    Random,
    /// Sort siblings by the numbers in their names, visit one at a time.
    Chronological,
}

struct Listing {
    files: Vec<MediaItem>,
    subfolders: Vec<String>,
    reused: bool,
}

struct ScanContext<'a> {
    session: &'a Mutex<ScanSession>,
    signal: &'a ScanSignal,
    max_depth: Option<u32>,
    tally: Mutex<ScanResult>,
}

/// Recursive, depth-bounded, cancellable folder walker.
pub struct FolderScanner {
    source: Arc<dyn MediaSource>,
    sampler: Arc<WeightedSampler>,
    order: ScanOrder,
    media_filter: MediaFilter,
    browse_timeout: Duration,
    batch_size: usize,
}

impl FolderScanner {
    pub fn new(
        source: Arc<dyn MediaSource>,
        sampler: Arc<WeightedSampler>,
        config: &EngineConfig,
    ) -> Self {
        let order = match config.queue.order {
            QueueOrder::Shuffled => ScanOrder::Random,
            QueueOrder::Sorted => ScanOrder::Chronological,
        };
        Self {
            source,
            sampler,
            order,
            media_filter: config.media_filter,
            browse_timeout: Duration::from_secs(config.scanner.browse_timeout_secs),
            batch_size: config.scanner.batch_size.max(1),
        }
    }

    pub fn order(&self) -> ScanOrder {
        self.order
    }

    /// Walk `root` down to `max_depth` levels below it.
    ///
    /// `None` means unlimited depth and `Some(0)` lists the root only.
    /// Failing to list the root is the only error returned; every other
    /// listing failure is logged and counted in `folders_failed`.
    pub async fn scan(
        &self,
        session: &Mutex<ScanSession>,
        root: &str,
        max_depth: Option<u32>,
        signal: &ScanSignal,
    ) -> Result<ScanOutcome> {
        let ctx = ScanContext {
            session,
            signal,
            max_depth,
            tally: Mutex::new(ScanResult::default()),
        };

        if let Err(interrupt) = signal.checkpoint() {
            return Ok(ScanOutcome::Interrupted(interrupt, ScanResult::default()));
        }

        info!(root = %root, source = self.source.name(), "Scanning folder tree");
        let listing = self.listing(&ctx, root).await.map_err(|e| {
            warn!(root = %root, error = %e, "Root folder could not be listed");
            e
        })?;

        let walked = self.process(&ctx, root, 0, listing).await;
        let result = *ctx.tally.lock();
        match walked {
            Ok(()) => {
                info!(
                    root = %root,
                    files_seen = result.files_seen,
                    files_added = result.files_added,
                    folders = result.folders_visited,
                    failed = result.folders_failed,
                    "Scan complete"
                );
                Ok(ScanOutcome::Completed(result))
            }
            Err(interrupt) => {
                info!(root = %root, reason = %interrupt, files_added = result.files_added, "Scan interrupted");
                Ok(ScanOutcome::Interrupted(interrupt, result))
            }
        }
    }

    /// List a folder, reusing the listing recorded earlier in the same pass.
    async fn listing(&self, ctx: &ScanContext<'_>, path: &str) -> Result<Listing> {
        let recorded = ctx
            .session
            .lock()
            .reusable_listing(path)
            .map(|node| Listing {
                files: node.files.clone(),
                subfolders: node.subfolders.clone(),
                reused: true,
            });
        if let Some(listing) = recorded {
            return Ok(listing);
        }

        let entries = tokio::time::timeout(self.browse_timeout, self.source.browse(path))
            .await
            .map_err(|_| Error::timeout("browse", self.browse_timeout.as_secs()))??;

        let mut files = Vec::new();
        let mut subfolders = Vec::new();
        for entry in entries {
            if entry.is_folder() {
                subfolders.push(entry.id);
                continue;
            }
            let Some(kind) = entry.media_class.media_kind() else {
                continue;
            };
            if self.media_filter.accepts(kind) {
                files.push(MediaItem::from_listing(entry.id, entry.title, kind, path));
            }
        }

        if self.order == ScanOrder::Chronological {
            subfolders.sort_by_cached_key(|p| ChronoKey::from_name(p));
            files.sort_by_cached_key(|f| ChronoKey::from_name(&f.title));
        }

        Ok(Listing {
            files,
            subfolders,
            reused: false,
        })
    }

    /// Record a folder's listing, sample its files and descend.
    fn process<'a>(
        &'a self,
        ctx: &'a ScanContext<'a>,
        path: &'a str,
        depth: u32,
        listing: Listing,
    ) -> BoxFuture<'a, std::result::Result<(), Interrupt>> {
        async move {
            let Listing {
                files,
                mut subfolders,
                reused,
            } = listing;

            {
                let mut session = ctx.session.lock();
                let mut tally = ctx.tally.lock();
                tally.folders_visited += 1;
                tally.files_seen += files.len();

                if !reused {
                    let node = FolderNode {
                        path: path.to_string(),
                        depth,
                        files: files.clone(),
                        subfolders: subfolders.clone(),
                        weight: self.sampler.folder_weight(path, files.len()),
                        pass: session.pass(),
                    };
                    session.record_folder(node);

                    for file in files {
                        if session.register(&file) {
                            tally.files_added += 1;
                            session.sample(&self.sampler, file);
                        }
                    }
                }

                if self.order == ScanOrder::Random {
                    subfolders.shuffle(session.rng_mut());
                }
            }
            debug!(path = %path, depth, subfolders = subfolders.len(), reused, "Folder processed");

            if ctx.max_depth.is_some_and(|max| depth >= max) {
                return Ok(());
            }

            let batch_size = match self.order {
                ScanOrder::Random => self.batch_size,
                ScanOrder::Chronological => 1,
            };
            for batch in subfolders.chunks(batch_size) {
                let settled = join_all(batch.iter().map(|child| self.visit(ctx, child, depth + 1))).await;
                for outcome in settled {
                    outcome?;
                }
            }
            Ok(())
        }
        .boxed()
    }

    /// Check the signal, list a sub-folder and process it.
    fn visit<'a>(
        &'a self,
        ctx: &'a ScanContext<'a>,
        path: &'a str,
        depth: u32,
    ) -> BoxFuture<'a, std::result::Result<(), Interrupt>> {
        async move {
            ctx.signal.checkpoint()?;
            match self.listing(ctx, path).await {
                Ok(listing) => self.process(ctx, path, depth, listing).await,
                Err(e) => {
                    warn!(path = %path, error = %e, "Skipping folder after listing failure");
                    ctx.tally.lock().folders_failed += 1;
                    Ok(())
                }
            }
        }
        .boxed()
    }
}
