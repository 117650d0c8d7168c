//! In-session transcript search.
//!
//! Case-insensitive substring containment over message content, with a
//! cyclic cursor for next/previous navigation. The match set is recomputed
//! synchronously whenever the query or the transcript changes; a stale
//! match set pointing at indices that no longer exist is a correctness bug,
//! not a performance tradeoff.

use crate::core::message::Message;

#[derive(Debug, Default)]
pub struct SearchState {
    query: String,
    matches: Vec<usize>,
    cursor: usize,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Replace the query and recompute matches against the given transcript.
    pub fn set_query(&mut self, query: &str, messages: &[Message]) {
        self.query = query.to_string();
        self.refresh(messages);
    }

    /// Recompute matches for the current query. Called after every transcript
    /// mutation as well as on query edits; the cursor resets to the first
    /// match either way.
    pub fn refresh(&mut self, messages: &[Message]) {
        self.matches = find_matches(&self.query, messages);
        self.cursor = 0;
    }

    /// Ordered transcript indices whose content contains the query.
    pub fn matches(&self) -> &[usize] {
        &self.matches
    }

    /// Transcript index of the match under the cursor, if any.
    pub fn current(&self) -> Option<usize> {
        self.matches.get(self.cursor).copied()
    }

    /// Position of the cursor within the match set (for "n of k" display).
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Advance the cursor, wrapping past the last match. No-op when empty.
    pub fn next(&mut self) -> Option<usize> {
        if self.matches.is_empty() {
            return None;
        }
        self.cursor = (self.cursor + 1) % self.matches.len();
        self.current()
    }

    /// Step the cursor back, wrapping to the last match from the first.
    /// No-op when empty.
    pub fn prev(&mut self) -> Option<usize> {
        if self.matches.is_empty() {
            return None;
        }
        self.cursor = if self.cursor == 0 {
            self.matches.len() - 1
        } else {
            self.cursor - 1
        };
        self.current()
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.matches.clear();
        self.cursor = 0;
    }
}

/// An empty or whitespace-only query matches nothing, not everything.
fn find_matches(query: &str, messages: &[Message]) -> Vec<usize> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let needle = trimmed.to_lowercase();
    messages
        .iter()
        .enumerate()
        .filter(|(_, message)| message.content.to_lowercase().contains(&needle))
        .map(|(index, _)| index)
        .collect()
}
