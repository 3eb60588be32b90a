//! Remote media source contract.
//!
//! This module defines the [`MediaSource`] trait every backend (a media
//! server, the local filesystem, an in-memory fixture) implements, along with
//! the shared request/response types.
//!
//! # Module layout
//!
//! - [`ordering`] -- Total order and cursor pagination shared by index backends.
//! - [`local`] -- Filesystem-backed source.
//! - [`memory`] -- In-memory source with failure injection, for tests and embedding.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slidequeue_common::{
    MediaClass, MediaFilter, MediaItem, MutationAction, OrderBy, OrderDirection, Result,
};

pub mod local;
pub mod memory;
pub mod ordering;

pub use local::LocalSource;
pub use memory::MemorySource;
pub use ordering::SortKey;

// ---------------------------------------------------------------------------
// Browse
// ---------------------------------------------------------------------------

/// A single child returned from a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseEntry {
    /// Content reference; folders use it as the path for the next listing.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Whether the entry can be listed itself.
    pub can_expand: bool,
    /// Coarse classification of the entry.
    pub media_class: MediaClass,
}

impl BrowseEntry {
    /// Convenience constructor for a folder entry.
    pub fn folder(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            can_expand: true,
            media_class: MediaClass::Directory,
        }
    }

    /// Convenience constructor for a leaf entry.
    pub fn file(id: impl Into<String>, title: impl Into<String>, media_class: MediaClass) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            can_expand: false,
            media_class,
        }
    }

    /// Whether this entry should be recursed into.
    pub fn is_folder(&self) -> bool {
        self.can_expand || self.media_class == MediaClass::Directory
    }
}

// ---------------------------------------------------------------------------
// Ordered index queries
// ---------------------------------------------------------------------------

/// A page request against an ordered index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderedQuery {
    /// Maximum number of items to return.
    pub count: usize,
    /// Folder to query.
    pub folder: String,
    /// Include items in sub-folders.
    pub recursive: bool,
    pub order_by: OrderBy,
    pub order_direction: OrderDirection,
    /// Exclusive lower bound: only items strictly after this key are returned.
    pub after: Option<SortKey>,
    /// Case-insensitive terms an item's id or title must contain (all of them).
    pub filters: Vec<String>,
    pub media_filter: MediaFilter,
}

impl OrderedQuery {
    /// Check an item against the folder scope and filters of this query.
    pub fn matches(&self, item: &MediaItem) -> bool {
        let in_scope = if self.folder.is_empty() {
            self.recursive || item.folder.is_empty()
        } else if self.recursive {
            item.folder == self.folder
                || item
                    .folder
                    .strip_prefix(self.folder.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        } else {
            item.folder == self.folder
        };

        in_scope
            && self.media_filter.accepts(item.kind)
            && self.filters.iter().all(|term| {
                let term = term.to_lowercase();
                item.id.to_lowercase().contains(&term) || item.title.to_lowercase().contains(&term)
            })
    }
}

/// One page of an ordered index query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderedPage {
    pub items: Vec<MediaItem>,
    /// Whether the backend believes more items follow this page.
    pub has_more: bool,
}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// Async trait that all media backends must implement.
///
/// Every method is a remote call from the engine's point of view: it may be
/// slow, time out, or fail. Listing failures are treated as branch-local by
/// the scanner; resolve and mutate failures propagate to the consumer.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Short, lowercase identifier for this source (e.g. `"local"`).
    fn name(&self) -> &'static str;

    /// List the direct children of a folder.
    async fn browse(&self, path: &str) -> Result<Vec<BrowseEntry>>;

    /// Obtain a displayable URL for an item, valid for roughly `ttl`.
    async fn resolve(&self, id: &str, ttl: Duration) -> Result<String>;

    /// Fetch one page from the ordered index.
    async fn query_ordered(&self, query: &OrderedQuery) -> Result<OrderedPage>;

    /// Apply a mutation to an item.
    async fn mutate(&self, id: &str, action: MutationAction) -> Result<()>;
}
