//! Linear view history with back/forward, modeled on a browser session.
//!
//! Position `None` is the initial page, which always restores to home.

use crate::model::{HistoryEntry, ViewState, restore};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationHistory {
    entries: Vec<HistoryEntry>,
    cursor: Option<usize>,
}

impl NavigationHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly entered view. Anything ahead of the cursor is dropped.
    pub fn push(&mut self, view: &ViewState) {
        let keep = self.cursor.map_or(0, |cursor| cursor + 1);
        self.entries.truncate(keep);
        self.entries.push(view.to_entry());
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Step back one entry and return the view to show.
    ///
    /// Returns `None` when already at the initial page.
    pub fn back(&mut self) -> Option<ViewState> {
        let cursor = self.cursor?;
        self.cursor = cursor.checked_sub(1);
        Some(self.current())
    }

    /// Step forward one entry, if there is one.
    pub fn forward(&mut self) -> Option<ViewState> {
        let next = self.cursor.map_or(0, |cursor| cursor + 1);
        if next >= self.entries.len() {
            return None;
        }
        self.cursor = Some(next);
        Some(self.current())
    }

    /// View for the current position.
    #[must_use]
    pub fn current(&self) -> ViewState {
        restore(self.current_entry())
    }

    #[must_use]
    pub fn current_entry(&self) -> Option<&HistoryEntry> {
        self.cursor.and_then(|cursor| self.entries.get(cursor))
    }

    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.cursor.is_some()
    }

    #[must_use]
    pub fn can_go_forward(&self) -> bool {
        self.cursor.map_or(0, |cursor| cursor + 1) < self.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
