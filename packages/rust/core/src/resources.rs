//! Flat, url-deduplicated list of learning resources.
//!
//! Enrichment feeds every video and document it finds into a
//! [`ResourceCollection`]. Observers get change notifications through a
//! `tokio::sync::watch` channel carrying the full list.

use std::collections::HashMap;

use tokio::sync::watch;

use roadmapper_shared::{ResourceEntry, ResourceKind};

/// Resources keyed by url, in first-insertion order.
#[derive(Debug)]
pub struct ResourceCollection {
    entries: Vec<ResourceEntry>,
    by_url: HashMap<String, usize>,
    changes: watch::Sender<Vec<ResourceEntry>>,
}

impl Default for ResourceCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceCollection {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(Vec::new());
        Self {
            entries: Vec::new(),
            by_url: HashMap::new(),
            changes,
        }
    }

    /// Insert an entry. A later entry with the same url replaces the earlier
    /// one in place. Returns `true` when the url was new.
    pub fn insert(&mut self, entry: ResourceEntry) -> bool {
        let added = self.upsert(entry);
        self.notify();
        added
    }

    /// Insert many entries with a single notification. Returns how many urls
    /// were new.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = ResourceEntry>) -> usize {
        let added = entries
            .into_iter()
            .map(|e| self.upsert(e))
            .filter(|&new| new)
            .count();
        self.notify();
        added
    }

    fn upsert(&mut self, entry: ResourceEntry) -> bool {
        match self.by_url.get(&entry.url) {
            Some(&index) => {
                self.entries[index] = entry;
                false
            }
            None => {
                self.by_url.insert(entry.url.clone(), self.entries.len());
                self.entries.push(entry);
                true
            }
        }
    }

    fn notify(&self) {
        self.changes.send_replace(self.entries.clone());
    }

    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    pub fn get(&self, url: &str) -> Option<&ResourceEntry> {
        self.by_url.get(url).map(|&i| &self.entries[i])
    }

    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Receiver that observes the list after every change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<ResourceEntry>> {
        self.changes.subscribe()
    }
}
