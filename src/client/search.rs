//! Search/filter state for the prompt list.
//!
//! Typing updates the visible input immediately while the value handed to
//! the actual query trails by a debounce window; every keystroke rearms
//! the timer, so only a value stable for the full window is applied.
//! Filter toggles reset pagination; clearing filters resets everything.

use std::collections::BTreeSet;

use tokio::time::{sleep_until, Duration, Instant};

use super::PromptQueryParams;

/// Debounce window observed by the search box.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Default page size used by the prompt list page.
pub const DEFAULT_PAGE_SIZE: i64 = 12;

/// Where a debounced value currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebouncePhase {
    /// No edit since the last applied value
    Idle,
    /// An edit is waiting out the debounce window
    Pending,
}

/// A text input whose applied value trails the typed value by a fixed
/// window. Dropping the state discards any pending value, so nothing acts
/// on it after unmount.
#[derive(Debug)]
pub struct DebouncedInput {
    window: Duration,
    value: String,
    applied: String,
    deadline: Option<Instant>,
}

impl DebouncedInput {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            value: String::new(),
            applied: String::new(),
            deadline: None,
        }
    }

    /// Record a keystroke: update the echoed value and rearm the timer.
    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.deadline = Some(Instant::now() + self.window);
    }

    /// The immediately-echoed input value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The last applied (settled) value.
    pub fn applied(&self) -> &str {
        &self.applied
    }

    pub fn phase(&self) -> DebouncePhase {
        if self.deadline.is_some() {
            DebouncePhase::Pending
        } else {
            DebouncePhase::Idle
        }
    }

    /// Wait for the debounce window to elapse, then apply the pending
    /// value. Returns `true` when the applied value changed (a refetch is
    /// warranted). Returns `false` immediately when nothing is pending.
    ///
    /// Cancelling the returned future (e.g. via `select!`) leaves the
    /// pending value armed.
    pub async fn settled(&mut self) -> bool {
        let Some(deadline) = self.deadline else {
            return false;
        };
        sleep_until(deadline).await;
        self.deadline = None;
        if self.applied == self.value {
            return false;
        }
        self.applied = self.value.clone();
        true
    }

    /// Apply the current value right away, cancelling any pending timer.
    pub fn apply_now(&mut self) {
        self.deadline = None;
        self.applied = self.value.clone();
    }
}

/// Client-side state behind the prompt list page: debounced search text,
/// tag selection, favorites toggle, and pagination.
#[derive(Debug)]
pub struct PromptFilterState {
    search: DebouncedInput,
    selected_tags: BTreeSet<String>,
    favorites_only: bool,
    page: i64,
    page_size: i64,
}

impl Default for PromptFilterState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PromptFilterState {
    pub fn new(page_size: i64) -> Self {
        Self {
            search: DebouncedInput::new(SEARCH_DEBOUNCE),
            selected_tags: BTreeSet::new(),
            favorites_only: false,
            page: 0,
            page_size,
        }
    }

    /// Record a keystroke in the search box.
    pub fn type_search(&mut self, text: impl Into<String>) {
        self.search.set(text);
    }

    /// Wait out the debounce window; `true` means the applied search term
    /// changed and the list should refetch.
    pub async fn settle_search(&mut self) -> bool {
        self.search.settled().await
    }

    pub fn search_input(&self) -> &str {
        self.search.value()
    }

    pub fn applied_search(&self) -> &str {
        self.search.applied()
    }

    pub fn search_phase(&self) -> DebouncePhase {
        self.search.phase()
    }

    /// Toggle a tag in the selection. Any filter change returns to the
    /// first page.
    pub fn toggle_tag(&mut self, name: &str) {
        if !self.selected_tags.remove(name) {
            self.selected_tags.insert(name.to_string());
        }
        self.page = 0;
    }

    pub fn selected_tags(&self) -> impl Iterator<Item = &str> {
        self.selected_tags.iter().map(String::as_str)
    }

    /// Toggle the favorites-only view (a purely client-side filter).
    pub fn toggle_favorites(&mut self) {
        self.favorites_only = !self.favorites_only;
        self.page = 0;
    }

    pub fn favorites_only(&self) -> bool {
        self.favorites_only
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn set_page(&mut self, page: i64) {
        self.page = page.max(0);
    }

    /// Reset search text, tag selection, and the favorites flag together,
    /// returning to the first page.
    pub fn clear_filters(&mut self) {
        self.search.set(String::new());
        self.search.apply_now();
        self.selected_tags.clear();
        self.favorites_only = false;
        self.page = 0;
    }

    /// Listing parameters for the current applied state. The favorites
    /// flag is not part of the server query.
    pub fn query_params(&self) -> PromptQueryParams {
        let applied = self.search.applied();
        PromptQueryParams {
            skip: self.page * self.page_size,
            limit: self.page_size,
            search: if applied.is_empty() {
                None
            } else {
                Some(applied.to_string())
            },
            tags: self.selected_tags.iter().cloned().collect(),
        }
    }
}
