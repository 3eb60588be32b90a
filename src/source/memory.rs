//! In-memory [`MediaSource`] with failure injection.
//!
//! Holds a folder tree and an item index entirely in memory. Listings can be
//! made to fail or stall per path, items can be marked missing (resolve
//! returns `NotFound`) and new items can be added at any time to simulate
//! content arriving while a consumer is running.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use slidequeue_common::paths;
use slidequeue_common::{Error, MediaClass, MediaItem, MediaKind, MutationAction, Result};

use super::ordering::paginate;
use super::{BrowseEntry, MediaSource, OrderedPage, OrderedQuery};

#[derive(Debug, Default)]
struct Tree {
    /// folder path -> child folder paths
    folders: BTreeMap<String, BTreeSet<String>>,
    /// item id -> item
    items: BTreeMap<String, MediaItem>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    missing: HashSet<String>,
    rejected_mutations: HashSet<String>,
}

impl Tree {
    fn ensure_folder(&mut self, path: &str) {
        if self.folders.contains_key(path) {
            return;
        }
        self.folders.insert(path.to_string(), BTreeSet::new());
        let parent = paths::parent(path);
        if !parent.is_empty() && parent != path {
            self.ensure_folder(parent);
            if let Some(children) = self.folders.get_mut(parent) {
                children.insert(path.to_string());
            }
        }
    }
}

/// An in-memory media tree.
#[derive(Debug, Default)]
pub struct MemorySource {
    tree: RwLock<Tree>,
    browse_calls: AtomicUsize,
    query_calls: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a folder (and its ancestors).
    pub fn add_folder(&self, path: &str) {
        self.tree.write().ensure_folder(path);
    }

    /// Add an item to its `folder`, creating folders as needed.
    pub fn add_item(&self, item: MediaItem) {
        let mut tree = self.tree.write();
        tree.ensure_folder(&item.folder);
        tree.items.insert(item.id.clone(), item);
    }

    /// Add `count` images named `{prefix}{n:05}.jpg` to `folder`.
    pub fn add_images(&self, folder: &str, prefix: &str, count: usize) {
        let mut tree = self.tree.write();
        tree.ensure_folder(folder);
        for n in 0..count {
            let title = format!("{prefix}{n:05}.jpg");
            let id = format!("{folder}/{title}");
            let item = MediaItem::from_listing(id.clone(), title, MediaKind::Image, folder);
            tree.items.insert(id, item);
        }
    }

    /// Remove an item outright.
    pub fn remove_item(&self, id: &str) -> Option<MediaItem> {
        self.tree.write().items.remove(id)
    }

    pub fn item(&self, id: &str) -> Option<MediaItem> {
        self.tree.read().items.get(id).cloned()
    }

    pub fn item_count(&self) -> usize {
        self.tree.read().items.len()
    }

    /// Make every listing of `path` fail with a transient error.
    pub fn fail_browse(&self, path: &str) {
        self.tree.write().failing.insert(path.to_string());
    }

    /// Stall every listing of `path` for `delay` before answering.
    pub fn delay_browse(&self, path: &str, delay: Duration) {
        self.tree.write().delays.insert(path.to_string(), delay);
    }

    /// Keep the item listed but make `resolve` report it as missing.
    pub fn mark_missing(&self, id: &str) {
        self.tree.write().missing.insert(id.to_string());
    }

    /// Make every mutation of `id` fail.
    pub fn reject_mutations(&self, id: &str) {
        self.tree.write().rejected_mutations.insert(id.to_string());
    }

    /// Number of `browse` calls served so far.
    pub fn browse_calls(&self) -> usize {
        self.browse_calls.load(Ordering::SeqCst)
    }

    /// Number of `query_ordered` calls served so far.
    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaSource for MemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn browse(&self, path: &str) -> Result<Vec<BrowseEntry>> {
        self.browse_calls.fetch_add(1, Ordering::SeqCst);

        let delay = {
            let tree = self.tree.read();
            if tree.failing.contains(path) {
                return Err(Error::transient("browse", format!("injected failure for {path}")));
            }
            tree.delays.get(path).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let tree = self.tree.read();
        let Some(children) = tree.folders.get(path) else {
            return Err(Error::not_found("folder", path));
        };

        let mut entries: Vec<BrowseEntry> = children
            .iter()
            .map(|child| BrowseEntry::folder(child.clone(), paths::file_name(child)))
            .collect();

        entries.extend(
            tree.items
                .values()
                .filter(|item| item.folder == path)
                .map(|item| {
                    let class = match item.kind {
                        MediaKind::Image => MediaClass::Image,
                        MediaKind::Video => MediaClass::Video,
                    };
                    BrowseEntry::file(item.id.clone(), item.title.clone(), class)
                }),
        );

        Ok(entries)
    }

    async fn resolve(&self, id: &str, ttl: Duration) -> Result<String> {
        let tree = self.tree.read();
        if tree.missing.contains(id) || !tree.items.contains_key(id) {
            return Err(Error::not_found("item", id));
        }
        Ok(format!("memory://{id}?ttl={}", ttl.as_secs()))
    }

    async fn query_ordered(&self, query: &OrderedQuery) -> Result<OrderedPage> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        let candidates: Vec<MediaItem> = self.tree.read().items.values().cloned().collect();
        Ok(paginate(candidates, query))
    }

    async fn mutate(&self, id: &str, action: MutationAction) -> Result<()> {
        let mut tree = self.tree.write();
        if tree.rejected_mutations.contains(id) {
            return Err(Error::mutation(action, id, "rejected by source"));
        }
        let Some(item) = tree.items.get(id).cloned() else {
            return Err(Error::not_found("item", id));
        };
        match action {
            MutationAction::Favorite | MutationAction::Unfavorite => {
                let updated = item.with_favorite(action == MutationAction::Favorite);
                tree.items.insert(id.to_string(), updated);
            }
            MutationAction::Delete | MutationAction::Edit => {
                tree.items.remove(id);
            }
        }
        Ok(())
    }
}
