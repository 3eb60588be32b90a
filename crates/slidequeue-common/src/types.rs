//! Core type definitions for media items and ordering.
//!
//! All enums are serialized in snake_case so they can be written directly in
//! configuration files and query payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::paths;

/// Kind of media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// A still image.
    Image,
    /// A video clip.
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Classification of a child returned by a browse listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaClass {
    /// A still image.
    Image,
    /// A video clip.
    Video,
    /// A folder that can be expanded further.
    Directory,
    /// Anything else (documents, audio, sidecar files).
    Other,
}

impl MediaClass {
    /// The media kind this class maps to, if it is servable media.
    pub fn media_kind(self) -> Option<MediaKind> {
        match self {
            Self::Image => Some(MediaKind::Image),
            Self::Video => Some(MediaKind::Video),
            Self::Directory | Self::Other => None,
        }
    }
}

/// Which kinds of media a scan or query should keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFilter {
    /// Images and videos.
    #[default]
    All,
    /// Images only.
    Images,
    /// Videos only.
    Videos,
}

impl MediaFilter {
    /// Check whether a media kind passes this filter.
    pub fn accepts(self, kind: MediaKind) -> bool {
        match self {
            Self::All => true,
            Self::Images => kind == MediaKind::Image,
            Self::Videos => kind == MediaKind::Video,
        }
    }
}

/// Sort key used for ordered traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    /// Capture time, falling back to modified then created time.
    #[default]
    DateTaken,
    /// File modification time.
    Modified,
    /// File creation time.
    Created,
    /// Display title / file name.
    Title,
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DateTaken => write!(f, "date_taken"),
            Self::Modified => write!(f, "modified"),
            Self::Created => write!(f, "created"),
            Self::Title => write!(f, "title"),
        }
    }
}

/// Direction for ordered traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    /// Oldest / alphabetically first.
    #[default]
    Asc,
    /// Newest / alphabetically last.
    Desc,
}

impl OrderDirection {
    /// Apply this direction to an ascending ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

/// Geographic position attached to a media item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

/// A single servable media item.
///
/// Items are immutable once discovered. Operations that change an item (such
/// as toggling a favorite) produce a new value that replaces the old entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Content reference string, unique within a source.
    pub id: String,
    /// Display title (usually the file name).
    pub title: String,
    /// Image or video.
    pub kind: MediaKind,
    /// Path of the folder the item was discovered in.
    pub folder: String,
    /// Capture time, from metadata or the file name.
    pub captured_at: Option<DateTime<Utc>>,
    /// Creation time reported by the source.
    pub created_at: Option<DateTime<Utc>>,
    /// Modification time reported by the source.
    pub modified_at: Option<DateTime<Utc>>,
    /// Where the item was captured, if known.
    pub location: Option<GeoPoint>,
    /// Whether the item is marked as a favorite.
    pub favorite: bool,
    /// Star rating (0-5), if known.
    pub rating: Option<u8>,
}

impl MediaItem {
    /// Create an item with no optional metadata.
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind,
            folder: String::new(),
            captured_at: None,
            created_at: None,
            modified_at: None,
            location: None,
            favorite: false,
            rating: None,
        }
    }

    /// Build an item from a browse listing entry, deriving the capture time
    /// from the file name when it carries one.
    pub fn from_listing(
        id: impl Into<String>,
        title: impl Into<String>,
        kind: MediaKind,
        folder: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let captured_at = paths::timestamp_from_name(&title);
        Self {
            folder: folder.into(),
            captured_at,
            ..Self::new(id, title, kind)
        }
    }

    /// Builder: set the folder.
    pub fn in_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    /// Builder: set the capture time.
    pub fn with_captured_at(mut self, at: DateTime<Utc>) -> Self {
        self.captured_at = Some(at);
        self
    }

    /// Builder: set the modification time.
    pub fn with_modified_at(mut self, at: DateTime<Utc>) -> Self {
        self.modified_at = Some(at);
        self
    }

    /// Builder: set the creation time.
    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Builder: set the location.
    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.location = Some(GeoPoint {
            latitude,
            longitude,
        });
        self
    }

    /// Builder: set the rating.
    pub fn with_rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating.min(5));
        self
    }

    /// Return a copy of this item with the favorite flag replaced.
    #[must_use]
    pub fn with_favorite(&self, favorite: bool) -> Self {
        Self {
            favorite,
            ..self.clone()
        }
    }

    /// Best available date: capture time, else modified, else created.
    pub fn resolved_date(&self) -> Option<DateTime<Utc>> {
        self.captured_at.or(self.modified_at).or(self.created_at)
    }

    /// The date used when ordering by `order_by`, if it applies.
    pub fn date_for(&self, order_by: OrderBy) -> Option<DateTime<Utc>> {
        match order_by {
            OrderBy::DateTaken => self.resolved_date(),
            OrderBy::Modified => self.modified_at.or(self.created_at),
            OrderBy::Created => self.created_at,
            OrderBy::Title => None,
        }
    }
}

/// An action a consumer can apply to the currently displayed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationAction {
    /// Mark as favorite.
    Favorite,
    /// Clear the favorite mark.
    Unfavorite,
    /// Delete the item from the source.
    Delete,
    /// Hand the item off for editing (moves it out of the collection).
    Edit,
}

impl MutationAction {
    /// Whether a successful mutation takes the item out of rotation.
    ///
    /// Favorite toggles keep the item and only replace its entry.
    pub fn removes_from_rotation(self) -> bool {
        matches!(self, Self::Delete | Self::Edit)
    }
}

impl fmt::Display for MutationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Favorite => write!(f, "favorite"),
            Self::Unfavorite => write!(f, "unfavorite"),
            Self::Delete => write!(f, "delete"),
            Self::Edit => write!(f, "edit"),
        }
    }
}
