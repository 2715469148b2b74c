//! Merge state of one tracked feed
//!
//! `items[0]` is the newest known item. Accepted items are never reordered:
//! newer pages are prepended, older pages appended, and the identifier set is
//! kept equal to the identifiers of `items` by every operation.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::types::{FeedItem, StreamPage};

/// Ordered, duplicate-free view of a feed
#[derive(Debug, Clone, Default)]
pub struct StreamState {
    items: Vec<FeedItem>,
    seen: HashSet<String>,
    cursor: Option<DateTime<Utc>>,
    retry_budget: u32,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with `page`, keeping the first of any repeated identifier
    pub fn replace(&mut self, page: StreamPage) -> usize {
        self.items.clear();
        self.seen.clear();
        self.cursor = page.oldest_timestamp();

        for item in page.into_items() {
            if self.seen.insert(item.id.clone()) {
                self.items.push(item);
            }
        }
        self.items.len()
    }

    /// Put unseen items of a newest-first page in front, in page order
    pub fn prepend_newer(&mut self, page: StreamPage) -> usize {
        if self.cursor.is_none() {
            self.cursor = page.oldest_timestamp();
        }

        let fresh: Vec<FeedItem> = page
            .into_items()
            .into_iter()
            .filter(|item| self.seen.insert(item.id.clone()))
            .collect();
        let count = fresh.len();
        self.items.splice(0..0, fresh);
        count
    }

    /// Append unseen items of an older page and move the cursor to the
    /// page's oldest timestamp. An empty page changes nothing.
    pub fn append_older(&mut self, page: StreamPage) -> usize {
        if let Some(oldest) = page.oldest_timestamp() {
            self.cursor = Some(oldest);
        }

        let before = self.items.len();
        for item in page.into_items() {
            if self.seen.insert(item.id.clone()) {
                self.items.push(item);
            }
        }
        self.items.len() - before
    }

    /// Keep only items for which `keep` returns true; returns how many were dropped
    pub fn retain(&mut self, mut keep: impl FnMut(&FeedItem) -> bool) -> usize {
        let before = self.items.len();
        let seen = &mut self.seen;
        self.items.retain(|item| {
            let kept = keep(item);
            if !kept {
                seen.remove(&item.id);
            }
            kept
        });
        before - self.items.len()
    }

    /// Back to empty
    pub fn clear(&mut self) {
        self.items.clear();
        self.seen.clear();
        self.cursor = None;
    }

    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Watermark for the next older-page request
    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        self.cursor
    }

    /// Resume from a watermark saved by an earlier, interrupted crawl
    pub fn set_cursor(&mut self, cursor: Option<DateTime<Utc>>) {
        self.cursor = cursor;
    }

    /// Unproductive iterations the running crawl may still spend
    pub fn retry_budget(&self) -> u32 {
        self.retry_budget
    }

    pub(crate) fn reset_retry_budget(&mut self, budget: u32) {
        self.retry_budget = budget;
    }

    /// Use one retry; false when none are left
    pub(crate) fn spend_retry(&mut self) -> bool {
        if self.retry_budget == 0 {
            return false;
        }
        self.retry_budget -= 1;
        true
    }

    /// Identifier count equals item count and every item is indexed
    pub fn is_consistent(&self) -> bool {
        self.seen.len() == self.items.len()
            && self.items.iter().all(|item| self.seen.contains(&item.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn item(id: &str, day: u32) -> FeedItem {
        FeedItem {
            id: id.to_string(),
            numeric_id: None,
            created_at: Utc.with_ymd_and_hms(2013, 5, day, 12, 0, 0).unwrap(),
            payload: json!({ "guid": id, "day": day }),
        }
    }

    fn page(items: Vec<FeedItem>) -> StreamPage {
        StreamPage::new(items)
    }

    fn ids(state: &StreamState) -> Vec<&str> {
        state.items().iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_replace_drops_in_page_duplicates() {
        let mut state = StreamState::new();
        let first = item("a", 5);
        let mut repeat = item("a", 3);
        repeat.payload = json!({ "guid": "a", "edited": true });

        let count = state.replace(page(vec![first.clone(), item("b", 4), repeat]));

        assert_eq!(count, 2);
        assert_eq!(ids(&state), vec!["a", "b"]);
        assert_eq!(state.items()[0], first);
        assert_eq!(state.cursor(), Some(Utc.with_ymd_and_hms(2013, 5, 3, 12, 0, 0).unwrap()));
        assert!(state.is_consistent());
    }

    #[test]
    fn test_replace_with_empty_page_unsets_cursor() {
        let mut state = StreamState::new();
        state.replace(page(vec![item("a", 5)]));
        state.replace(page(vec![]));
        assert!(state.is_empty());
        assert_eq!(state.cursor(), None);
    }

    #[test]
    fn test_prepend_keeps_page_order_and_existing_items() {
        let mut state = StreamState::new();
        state.replace(page(vec![item("c", 3), item("d", 2)]));
        let cursor = state.cursor();

        let added = state.prepend_newer(page(vec![item("a", 5), item("b", 4), item("c", 3)]));

        assert_eq!(added, 2);
        assert_eq!(ids(&state), vec!["a", "b", "c", "d"]);
        assert_eq!(state.cursor(), cursor);
        assert!(state.is_consistent());
    }

    #[test]
    fn test_prepend_is_idempotent() {
        let mut state = StreamState::new();
        state.replace(page(vec![item("b", 4)]));
        let newest = page(vec![item("a", 5), item("b", 4)]);

        state.prepend_newer(newest.clone());
        let snapshot = ids(&state).into_iter().map(str::to_string).collect::<Vec<_>>();
        assert_eq!(state.prepend_newer(newest), 0);
        assert_eq!(ids(&state), snapshot);
    }

    #[test]
    fn test_accepted_payload_is_never_overwritten() {
        let mut state = StreamState::new();
        state.replace(page(vec![item("a", 5)]));
        let mut changed = item("a", 5);
        changed.payload = json!({ "guid": "a", "text": "edited" });

        state.prepend_newer(page(vec![changed.clone()]));
        state.append_older(page(vec![changed]));

        assert_eq!(state.items()[0].payload, json!({ "guid": "a", "day": 5 }));
    }

    #[test]
    fn test_append_moves_cursor_even_for_duplicates() {
        let mut state = StreamState::new();
        state.replace(page(vec![item("a", 5), item("b", 4)]));

        let added = state.append_older(page(vec![item("b", 4), item("a", 1)]));

        assert_eq!(added, 0);
        assert_eq!(state.len(), 2);
        assert_eq!(state.cursor(), Some(Utc.with_ymd_and_hms(2013, 5, 1, 12, 0, 0).unwrap()));
    }

    #[test]
    fn test_append_empty_page_keeps_cursor() {
        let mut state = StreamState::new();
        state.replace(page(vec![item("a", 5)]));
        let cursor = state.cursor();

        assert_eq!(state.append_older(page(vec![])), 0);
        assert_eq!(state.cursor(), cursor);
    }

    #[test]
    fn test_append_only_adds_at_the_end() {
        let mut state = StreamState::new();
        state.replace(page(vec![item("a", 9), item("b", 8)]));

        state.append_older(page(vec![item("c", 7), item("b", 8), item("d", 6)]));

        assert_eq!(ids(&state), vec!["a", "b", "c", "d"]);
        assert!(state.is_consistent());
    }

    #[test]
    fn test_retain_updates_identifier_set() {
        let mut state = StreamState::new();
        state.replace(page(vec![item("a", 5), item("b", 4), item("c", 3)]));

        let removed = state.retain(|i| i.id != "b");

        assert_eq!(removed, 1);
        assert!(!state.contains("b"));
        assert_eq!(ids(&state), vec!["a", "c"]);
        assert!(state.is_consistent());
    }

    #[test]
    fn test_clear() {
        let mut state = StreamState::new();
        state.replace(page(vec![item("a", 5)]));
        state.clear();
        assert!(state.is_empty());
        assert!(!state.contains("a"));
        assert_eq!(state.cursor(), None);
    }

    #[test]
    fn test_retry_budget() {
        let mut state = StreamState::new();
        state.reset_retry_budget(1);
        assert!(state.spend_retry());
        assert!(!state.spend_retry());
        assert_eq!(state.retry_budget(), 0);
    }
}
