//! Cursor and lookahead buffer for ordered traversal.

use std::collections::{HashSet, VecDeque};

use slidequeue_common::{MediaItem, OrderBy, OrderDirection};

use crate::source::ordering::sort_items;
use crate::source::{OrderedPage, SortKey};

/// Position of a sequential traversal through the remote index.
///
/// Cloned into the session registry when the consumer detaches.
#[derive(Debug, Clone)]
pub struct CursorState {
    /// Key of the last item fetched; `None` at the origin.
    pub cursor: Option<SortKey>,
    pub has_more: bool,
    pub buffer: VecDeque<MediaItem>,
    /// Ids known to be invalid for the current cycle.
    pub excluded: HashSet<String>,
    /// First item of the current cycle.
    pub head: Option<MediaItem>,
    pub auto_loop: bool,
}

impl CursorState {
    pub fn new(auto_loop: bool) -> Self {
        Self {
            cursor: None,
            has_more: true,
            buffer: VecDeque::new(),
            excluded: HashSet::new(),
            head: None,
            auto_loop,
        }
    }

    pub fn at_origin(&self) -> bool {
        self.cursor.is_none()
    }

    /// Whether another page should be fetched now.
    pub fn needs_fill(&self, low_water: usize) -> bool {
        self.has_more && self.buffer.len() < low_water
    }

    /// Go back to the start of the index. Exclusions are per cycle and
    /// are cleared too.
    pub fn reset_to_origin(&mut self) {
        self.cursor = None;
        self.has_more = true;
        self.buffer.clear();
        self.excluded.clear();
    }

    /// Take in one fetched page.
    ///
    /// The page is re-sorted locally, the cursor moves to its last item and
    /// a short page ends the cycle. Returns the number of items buffered.
    pub fn accept_page(
        &mut self,
        page: OrderedPage,
        requested: usize,
        order_by: OrderBy,
        direction: OrderDirection,
    ) -> usize {
        let OrderedPage { mut items, has_more } = page;
        sort_items(&mut items, order_by, direction);

        self.has_more = has_more && items.len() >= requested;
        if let Some(last) = items.last() {
            if self.at_origin() {
                self.head = items.first().cloned();
            }
            self.cursor = Some(SortKey::of(last, order_by));
        }

        let before = self.buffer.len();
        for item in items {
            let duplicate = self.buffer.iter().any(|b| b.id == item.id);
            if !duplicate && !self.excluded.contains(&item.id) {
                self.buffer.push_back(item);
            }
        }
        self.buffer.len() - before
    }

    /// Next buffered item that is not excluded.
    pub fn pop(&mut self) -> Option<MediaItem> {
        while let Some(item) = self.buffer.pop_front() {
            if !self.excluded.contains(&item.id) {
                return Some(item);
            }
        }
        None
    }

    pub fn exclude(&mut self, id: &str) {
        self.excluded.insert(id.to_string());
        self.buffer.retain(|item| item.id != id);
    }
}

impl Default for CursorState {
    fn default() -> Self {
        Self::new(true)
    }
}
