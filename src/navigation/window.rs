//! Bounded navigation window and display history.

use std::collections::VecDeque;

use serde::Serialize;
use slidequeue_common::MediaItem;

/// Current index and window length, as reported to the consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Position {
    /// `None` before the first item was shown.
    pub index: Option<usize>,
    pub total: usize,
}

/// Window and history contents kept across a detach.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationSnapshot {
    pub items: Vec<MediaItem>,
    pub index: Option<usize>,
    pub history: Vec<String>,
    pub evicted_since_wrap: bool,
}

/// Items the consumer can move back and forth through.
///
/// An id appears at most once. The index is either `None` or a valid
/// position. Appending past the bound evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct NavigationWindow {
    items: VecDeque<MediaItem>,
    index: Option<usize>,
    bound: usize,
    evicted_since_wrap: bool,
}

impl NavigationWindow {
    pub fn new(bound: usize) -> Self {
        Self {
            items: VecDeque::new(),
            index: None,
            bound: bound.max(1),
            evicted_since_wrap: false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn position(&self) -> Position {
        Position {
            index: self.index,
            total: self.items.len(),
        }
    }

    pub fn current(&self) -> Option<&MediaItem> {
        self.index.and_then(|i| self.items.get(i))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    pub fn items(&self) -> impl Iterator<Item = &MediaItem> {
        self.items.iter()
    }

    /// Whether entries were evicted since the index last wrapped.
    pub fn evicted_since_wrap(&self) -> bool {
        self.evicted_since_wrap
    }

    pub fn clear_evicted(&mut self) {
        self.evicted_since_wrap = false;
    }

    /// Move forward inside the window, if there is a next entry.
    pub fn advance(&mut self) -> Option<MediaItem> {
        let next = self.index.map_or(0, |i| i + 1);
        if next < self.items.len() {
            self.index = Some(next);
            self.items.get(next).cloned()
        } else {
            None
        }
    }

    /// Move back, wrapping to the last entry.
    pub fn retreat(&mut self) -> Option<MediaItem> {
        let last = self.items.len().checked_sub(1)?;
        let prev = match self.index {
            Some(i) if i > 0 => i - 1,
            _ => last,
        };
        self.index = Some(prev);
        self.items.get(prev).cloned()
    }

    /// Append an item and select it. Returns `false` for a duplicate id.
    pub fn push(&mut self, item: MediaItem) -> bool {
        if self.contains(&item.id) {
            return false;
        }
        self.items.push_back(item);
        while self.items.len() > self.bound {
            self.items.pop_front();
            self.evicted_since_wrap = true;
        }
        self.index = Some(self.items.len() - 1);
        true
    }

    /// Insert items at the front, in order, and select the first one.
    ///
    /// Duplicates are skipped; overflow is evicted from the back.
    pub fn insert_front(&mut self, items: Vec<MediaItem>) -> usize {
        let fresh: Vec<MediaItem> = items
            .into_iter()
            .filter(|item| !self.contains(&item.id))
            .collect();
        let count = fresh.len();
        for item in fresh.into_iter().rev() {
            self.items.push_front(item);
        }
        while self.items.len() > self.bound {
            self.items.pop_back();
            self.evicted_since_wrap = true;
        }
        if !self.items.is_empty() {
            self.index = Some(0);
        }
        count
    }

    /// Jump back to the first entry.
    pub fn wrap_to_start(&mut self) -> Option<MediaItem> {
        let first = self.items.front().cloned()?;
        self.index = Some(0);
        self.evicted_since_wrap = false;
        Some(first)
    }

    /// Remove an id, keeping the index on a surviving entry.
    ///
    /// Removing the current entry selects the one before it, so the next
    /// forward step shows the entry that followed the removed one.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(pos) = self.items.iter().position(|item| item.id == id) else {
            return false;
        };
        self.items.remove(pos);
        self.index = match self.index {
            Some(i) if pos < i => Some(i - 1),
            Some(i) if pos == i => i.checked_sub(1),
            other => other,
        };
        if let Some(i) = self.index {
            if i >= self.items.len() {
                self.index = self.items.len().checked_sub(1);
            }
        }
        true
    }

    /// Replace the entry with the same id.
    pub fn replace(&mut self, item: MediaItem) -> bool {
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> (Vec<MediaItem>, Option<usize>, bool) {
        (
            self.items.iter().cloned().collect(),
            self.index,
            self.evicted_since_wrap,
        )
    }

    /// Rebuild from a snapshot, trimming to the bound.
    pub fn restore(&mut self, snapshot: &NavigationSnapshot) {
        self.items.clear();
        for item in &snapshot.items {
            if !self.contains(&item.id) {
                self.items.push_back(item.clone());
            }
        }
        while self.items.len() > self.bound {
            self.items.pop_front();
        }
        self.index = snapshot
            .index
            .filter(|&i| i < self.items.len())
            .or_else(|| snapshot.index.and(self.items.len().checked_sub(1)));
        self.evicted_since_wrap = snapshot.evicted_since_wrap;
    }
}

/// Bounded list of ids in the order they were shown.
#[derive(Debug, Clone)]
pub struct History {
    ids: VecDeque<String>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, id: &str) {
        self.ids.push_back(id.to_string());
        while self.ids.len() > self.capacity {
            self.ids.pop_front();
        }
    }

    pub fn remove(&mut self, id: &str) {
        self.ids.retain(|h| h != id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn restore(&mut self, ids: &[String]) {
        self.ids.clear();
        for id in ids {
            self.push(id);
        }
    }
}
