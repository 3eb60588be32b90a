//! Total order over media items and cursor pagination.
//!
//! Items with a resolvable date always come before undated items. Dated items
//! are ordered by date in the requested direction; undated items are ordered
//! alphabetically by title. Title and id break every remaining tie, so the
//! order is stable and reproducible for identical input.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slidequeue_common::{MediaItem, OrderBy, OrderDirection};

use super::{OrderedPage, OrderedQuery};

/// Position of an item in the index; doubles as the pagination cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub date: Option<DateTime<Utc>>,
    pub title: String,
    pub id: String,
}

impl SortKey {
    /// Key of `item` under `order_by`.
    pub fn of(item: &MediaItem, order_by: OrderBy) -> Self {
        Self {
            date: item.date_for(order_by),
            title: item.title.to_lowercase(),
            id: item.id.clone(),
        }
    }

    /// Compare two keys under the given order.
    pub fn compare(&self, other: &Self, order_by: OrderBy, direction: OrderDirection) -> Ordering {
        match (self.date, other.date) {
            (Some(a), Some(b)) => direction
                .apply(a.cmp(&b))
                .then_with(|| self.title.cmp(&other.title))
                .then_with(|| self.id.cmp(&other.id)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => {
                let by_name = self
                    .title
                    .cmp(&other.title)
                    .then_with(|| self.id.cmp(&other.id));
                if order_by == OrderBy::Title {
                    direction.apply(by_name)
                } else {
                    by_name
                }
            }
        }
    }
}

/// Sort items in place under the given order.
pub fn sort_items(items: &mut [MediaItem], order_by: OrderBy, direction: OrderDirection) {
    items.sort_by_cached_key(|item| OrderedKey {
        key: SortKey::of(item, order_by),
        order_by,
        direction,
    });
}

/// `Ord` adapter so keys can be used with `sort_by_cached_key`.
#[derive(PartialEq, Eq)]
struct OrderedKey {
    key: SortKey,
    order_by: OrderBy,
    direction: OrderDirection,
}

impl Ord for OrderedKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.compare(&other.key, self.order_by, self.direction)
    }
}

impl PartialOrd for OrderedKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Answer an ordered query over a full candidate list.
///
/// Used by backends that hold (or can cheaply rebuild) their whole index.
pub fn paginate(candidates: Vec<MediaItem>, query: &OrderedQuery) -> OrderedPage {
    let mut items: Vec<MediaItem> = candidates
        .into_iter()
        .filter(|item| query.matches(item))
        .collect();
    sort_items(&mut items, query.order_by, query.order_direction);

    let start = match &query.after {
        Some(cursor) => items.partition_point(|item| {
            SortKey::of(item, query.order_by).compare(cursor, query.order_by, query.order_direction)
                != Ordering::Greater
        }),
        None => 0,
    };

    let remaining = items.len().saturating_sub(start);
    let page: Vec<MediaItem> = items.into_iter().skip(start).take(query.count).collect();

    OrderedPage {
        has_more: remaining > page.len(),
        items: page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use slidequeue_common::{MediaFilter, MediaKind};

    fn dated(id: &str, day: u32) -> MediaItem {
        MediaItem::new(id, id, MediaKind::Image)
            .in_folder("media")
            .with_captured_at(Utc.with_ymd_and_hms(2022, 1, day, 0, 0, 0).unwrap())
    }

    fn undated(id: &str) -> MediaItem {
        MediaItem::new(id, id, MediaKind::Image).in_folder("media")
    }

    fn query(count: usize, after: Option<SortKey>, direction: OrderDirection) -> OrderedQuery {
        OrderedQuery {
            count,
            folder: "media".into(),
            recursive: true,
            order_by: OrderBy::DateTaken,
            order_direction: direction,
            after,
            filters: Vec::new(),
            media_filter: MediaFilter::All,
        }
    }

    fn ids(items: &[MediaItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn dated_before_undated() {
        let mut items = vec![undated("b"), dated("x", 3), undated("a"), dated("y", 1)];
        sort_items(&mut items, OrderBy::DateTaken, OrderDirection::Asc);
        assert_eq!(ids(&items), vec!["y", "x", "a", "b"]);
    }

    #[test]
    fn descending_keeps_undated_last_and_alphabetical() {
        let mut items = vec![undated("b"), dated("x", 3), undated("a"), dated("y", 1)];
        sort_items(&mut items, OrderBy::DateTaken, OrderDirection::Desc);
        assert_eq!(ids(&items), vec!["x", "y", "a", "b"]);
    }

    #[test]
    fn sort_is_reproducible() {
        let base = vec![dated("c", 2), dated("b", 2), undated("z"), dated("a", 2)];
        let mut first = base.clone();
        let mut second: Vec<MediaItem> = base.into_iter().rev().collect();
        sort_items(&mut first, OrderBy::DateTaken, OrderDirection::Asc);
        sort_items(&mut second, OrderBy::DateTaken, OrderDirection::Asc);
        assert_eq!(first, second);
        assert_eq!(ids(&first), vec!["a", "b", "c", "z"]);
    }

    #[test]
    fn title_order_respects_direction() {
        let mut items = vec![undated("a"), undated("c"), undated("b")];
        sort_items(&mut items, OrderBy::Title, OrderDirection::Desc);
        assert_eq!(ids(&items), vec!["c", "b", "a"]);
    }

    #[test]
    fn paginate_walks_without_gaps_or_repeats() {
        let items: Vec<MediaItem> = (1..=7).map(|d| dated(&format!("i{d}"), d)).collect();

        let first = paginate(items.clone(), &query(3, None, OrderDirection::Asc));
        assert_eq!(ids(&first.items), vec!["i1", "i2", "i3"]);
        assert!(first.has_more);

        let cursor = SortKey::of(first.items.last().unwrap(), OrderBy::DateTaken);
        let second = paginate(items.clone(), &query(3, Some(cursor), OrderDirection::Asc));
        assert_eq!(ids(&second.items), vec!["i4", "i5", "i6"]);

        let cursor = SortKey::of(second.items.last().unwrap(), OrderBy::DateTaken);
        let third = paginate(items, &query(3, Some(cursor), OrderDirection::Asc));
        assert_eq!(ids(&third.items), vec!["i7"]);
        assert!(!third.has_more);
    }

    #[test]
    fn paginate_across_dated_and_undated_boundary() {
        let items = vec![dated("d1", 1), undated("u1"), undated("u2")];
        let first = paginate(items.clone(), &query(2, None, OrderDirection::Asc));
        assert_eq!(ids(&first.items), vec!["d1", "u1"]);
        let cursor = SortKey::of(&first.items[1], OrderBy::DateTaken);
        let second = paginate(items, &query(2, Some(cursor), OrderDirection::Asc));
        assert_eq!(ids(&second.items), vec!["u2"]);
    }
}
