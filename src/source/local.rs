//! Filesystem-backed [`MediaSource`].
//!
//! Folder listings use `tokio::fs`; ordered queries walk the requested folder
//! with `walkdir` on a blocking thread and paginate the result. Content
//! references are the absolute (or root-relative) path strings of the files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use slidequeue_common::paths::media_kind_for;
use slidequeue_common::{Error, MediaClass, MediaItem, MediaKind, MutationAction, Result};
use walkdir::WalkDir;

use super::ordering::paginate;
use super::{BrowseEntry, MediaSource, OrderedPage, OrderedQuery};

/// Media source over a directory tree on the local filesystem.
#[derive(Debug, Default)]
pub struct LocalSource {
    favorites: Mutex<HashSet<String>>,
}

impl LocalSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_hidden(name: &str) -> bool {
        name.starts_with('.')
    }

    fn map_io(operation: &str, path: &str, err: std::io::Error) -> Error {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::not_found("path", path)
        } else {
            Error::transient(operation, format!("{path}: {err}"))
        }
    }

    fn item_from_path(path: &Path, kind: MediaKind, favorites: &HashSet<String>) -> MediaItem {
        let id = path.to_string_lossy().to_string();
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| id.clone());
        let folder = path
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut item = MediaItem::from_listing(id.clone(), title, kind, folder);
        if let Ok(meta) = std::fs::metadata(path) {
            if let Ok(modified) = meta.modified() {
                item = item.with_modified_at(DateTime::<Utc>::from(modified));
            }
            if let Ok(created) = meta.created() {
                item = item.with_created_at(DateTime::<Utc>::from(created));
            }
        }
        if favorites.contains(&id) {
            item = item.with_favorite(true);
        }
        item
    }

    fn collect_items(folder: &Path, recursive: bool, favorites: &HashSet<String>) -> Vec<MediaItem> {
        let walker = WalkDir::new(folder)
            .follow_links(true)
            .min_depth(1)
            .max_depth(if recursive { usize::MAX } else { 1 });

        walker
            .into_iter()
            .filter_entry(|e| {
                e.file_name()
                    .to_str()
                    .map(|n| !Self::is_hidden(n))
                    .unwrap_or(false)
            })
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!(error = %err, "Error walking directory");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?;
                let kind = media_kind_for(name)?;
                Some(Self::item_from_path(entry.path(), kind, favorites))
            })
            .collect()
    }
}

#[async_trait]
impl MediaSource for LocalSource {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn browse(&self, path: &str) -> Result<Vec<BrowseEntry>> {
        let mut dir = tokio::fs::read_dir(path)
            .await
            .map_err(|e| Self::map_io("browse", path, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| Self::map_io("browse", path, e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if Self::is_hidden(&name) {
                continue;
            }
            let id = entry.path().to_string_lossy().to_string();
            let file_type = match entry.file_type().await {
                Ok(ft) => ft,
                Err(e) => {
                    tracing::debug!(path = %id, error = %e, "Skipping entry without file type");
                    continue;
                }
            };

            if file_type.is_dir() {
                entries.push(BrowseEntry::folder(id, name));
            } else {
                let class = match media_kind_for(&name) {
                    Some(MediaKind::Image) => MediaClass::Image,
                    Some(MediaKind::Video) => MediaClass::Video,
                    None => MediaClass::Other,
                };
                entries.push(BrowseEntry::file(id, name, class));
            }
        }

        entries.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(entries)
    }

    async fn resolve(&self, id: &str, _ttl: Duration) -> Result<String> {
        let meta = tokio::fs::metadata(id)
            .await
            .map_err(|e| Self::map_io("resolve", id, e))?;
        if !meta.is_file() {
            return Err(Error::not_found("item", id));
        }
        Ok(format!("file://{id}"))
    }

    async fn query_ordered(&self, query: &OrderedQuery) -> Result<OrderedPage> {
        let folder = PathBuf::from(&query.folder);
        if !folder.is_dir() {
            return Err(Error::not_found("folder", &query.folder));
        }

        let favorites = self.favorites.lock().clone();
        let recursive = query.recursive;
        let items =
            tokio::task::spawn_blocking(move || Self::collect_items(&folder, recursive, &favorites))
        .await
        .map_err(|e| Error::internal(format!("index walk panicked: {e}")))?;

        Ok(paginate(items, query))
    }

    async fn mutate(&self, id: &str, action: MutationAction) -> Result<()> {
        match action {
            MutationAction::Favorite => {
                self.favorites.lock().insert(id.to_string());
                Ok(())
            }
            MutationAction::Unfavorite => {
                self.favorites.lock().remove(id);
                Ok(())
            }
            MutationAction::Delete => tokio::fs::remove_file(id)
                .await
                .map_err(|e| Error::mutation(action, id, e)),
            MutationAction::Edit => Err(Error::Unsupported(
                "editing is not available for local folders".into(),
            )),
        }
    }
}
