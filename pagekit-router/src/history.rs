//! Session history abstraction.

use std::sync::{Arc, PoisonError, RwLock};

/// Session history the router navigates, the equivalent of `window.history`.
///
/// URLs are path plus query string, e.g. `/pmp/interventions/list?page=2`.
pub trait History: Send + Sync {
    /// Current URL.
    fn location(&self) -> String;
    /// Adds `url` as a new entry, dropping any forward entries.
    fn push_state(&self, url: &str);
    /// Replaces the current entry with `url`.
    fn replace_state(&self, url: &str);
}

impl<H: History + ?Sized> History for Arc<H> {
    fn location(&self) -> String {
        (**self).location()
    }

    fn push_state(&self, url: &str) {
        (**self).push_state(url)
    }

    fn replace_state(&self, url: &str) {
        (**self).replace_state(url)
    }
}

#[derive(Debug)]
struct Entries {
    urls: Vec<String>,
    index: usize,
}

/// In-memory [`History`]. Clones share the same entries.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Arc<RwLock<Entries>>,
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("/")
    }
}

impl MemoryHistory {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Entries {
                urls: vec![initial.into()],
                index: 0,
            })),
        }
    }

    /// Number of entries, forward entries included.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Moves to the previous entry. Returns `false` at the first entry.
    pub fn back(&self) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.index == 0 {
            return false;
        }
        entries.index -= 1;
        true
    }

    /// Moves to the next entry. Returns `false` at the last entry.
    pub fn forward(&self) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.index + 1 >= entries.urls.len() {
            return false;
        }
        entries.index += 1;
        true
    }
}

impl History for MemoryHistory {
    fn location(&self) -> String {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.urls[entries.index].clone()
    }

    fn push_state(&self, url: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let next = entries.index + 1;
        entries.urls.truncate(next);
        entries.urls.push(url.to_string());
        entries.index = next;
    }

    fn replace_state(&self, url: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let index = entries.index;
        entries.urls[index] = url.to_string();
    }
}
