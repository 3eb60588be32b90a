//! Name utilities for media detection and chronological ordering.
//!
//! Remote sources hand out content references rather than filesystem paths,
//! so everything here works on plain strings. The same chronological key is
//! used to order sibling folders and the files inside a folder.

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::cmp::Ordering;
use std::sync::OnceLock;

use crate::types::MediaKind;

/// List of supported image file extensions.
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "heic", "heif", "avif", "tif", "tiff",
];

/// List of supported video file extensions.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "webm", "mkv", "avi", "3gp"];

/// Earliest and latest years accepted when reading dates out of names.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1970..=2100;

fn extension(name: &str) -> Option<String> {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Classify a name by its extension.
///
/// # Examples
///
/// ```
/// use slidequeue_common::paths::media_kind_for;
/// use slidequeue_common::MediaKind;
///
/// assert_eq!(media_kind_for("trip/IMG_0001.JPG"), Some(MediaKind::Image));
/// assert_eq!(media_kind_for("clip.mp4"), Some(MediaKind::Video));
/// assert_eq!(media_kind_for("notes.txt"), None);
/// ```
pub fn media_kind_for(name: &str) -> Option<MediaKind> {
    let ext = extension(name)?;
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// The last path segment of a `/`-separated content reference.
pub fn file_name(reference: &str) -> &str {
    reference
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(reference)
}

/// The parent of a `/`-separated content reference, or `""` at the top.
pub fn parent(reference: &str) -> &str {
    match reference.trim_end_matches('/').rsplit_once('/') {
        Some((parent, _)) => parent,
        None => "",
    }
}

fn datetime_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:^|\D)(\d{4})[-_.]?(\d{2})[-_.]?(\d{2})[ _T-]?(\d{2})[-_.:]?(\d{2})[-_.:]?(\d{2})(?:\D|$)",
        )
        .expect("datetime pattern is valid")
    })
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|\D)(\d{4})[-_.]?(\d{2})[-_.]?(\d{2})(?:\D|$)")
            .expect("date pattern is valid")
    })
}

fn epoch_millis_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|\D)(1\d{12})(?:\D|$)").expect("epoch pattern is valid"))
}

fn digits_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("digits pattern is valid"))
}

fn capture_u32(caps: &regex::Captures<'_>, idx: usize) -> Option<u32> {
    caps.get(idx)?.as_str().parse().ok()
}

/// Extract a timestamp embedded in a file or folder name.
///
/// Recognises `YYYYMMDD_HHMMSS`-style stamps (with optional separators),
/// bare `YYYY-MM-DD` dates and 13-digit epoch milliseconds.
///
/// # Examples
///
/// ```
/// use slidequeue_common::paths::timestamp_from_name;
///
/// assert!(timestamp_from_name("PXL_20230704_201512345.jpg").is_some());
/// assert!(timestamp_from_name("2019-08-01 beach.jpg").is_some());
/// assert!(timestamp_from_name("holiday.jpg").is_none());
/// ```
pub fn timestamp_from_name(name: &str) -> Option<DateTime<Utc>> {
    let name = file_name(name);

    if let Some(caps) = datetime_regex().captures(name) {
        let year = capture_u32(&caps, 1)? as i32;
        let date = valid_date(year, capture_u32(&caps, 2)?, capture_u32(&caps, 3)?);
        if let Some(date) = date {
            let time = date.and_hms_opt(
                capture_u32(&caps, 4)?,
                capture_u32(&caps, 5)?,
                capture_u32(&caps, 6)?,
            );
            if let Some(time) = time {
                return Some(time.and_utc());
            }
        }
    }

    if let Some(caps) = date_regex().captures(name) {
        let year = capture_u32(&caps, 1)? as i32;
        if let Some(date) = valid_date(year, capture_u32(&caps, 2)?, capture_u32(&caps, 3)?) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    let caps = epoch_millis_regex().captures(name)?;
    let millis: i64 = caps.get(1)?.as_str().parse().ok()?;
    DateTime::from_timestamp_millis(millis)
}

fn valid_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if !YEAR_RANGE.contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Ordering key derived from the numbers in a name.
///
/// Names carrying a recognisable timestamp contribute its calendar
/// components; otherwise every run of digits contributes one component.
/// Keys compare component-wise, names without any numbers sort after all
/// numbered names, and the lowercased name breaks ties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChronoKey {
    components: Vec<u64>,
    name: String,
}

impl ChronoKey {
    /// Build the key for a file or folder name.
    pub fn from_name(name: &str) -> Self {
        let base = file_name(name);
        let components = match timestamp_from_name(base) {
            Some(ts) => {
                use chrono::{Datelike, Timelike};
                vec![
                    ts.year() as u64,
                    u64::from(ts.month()),
                    u64::from(ts.day()),
                    u64::from(ts.hour()),
                    u64::from(ts.minute()),
                    u64::from(ts.second()),
                ]
            }
            None => digits_regex()
                .find_iter(base)
                .filter_map(|m| m.as_str().parse::<u64>().ok())
                .collect(),
        };
        Self {
            components,
            name: base.to_lowercase(),
        }
    }

    /// The numeric components this key orders by.
    pub fn components(&self) -> &[u64] {
        &self.components
    }
}

impl Ord for ChronoKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.components.is_empty(), other.components.is_empty()) {
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            _ => self
                .components
                .cmp(&other.components)
                .then_with(|| self.name.cmp(&other.name)),
        }
    }
}

impl PartialOrd for ChronoKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
