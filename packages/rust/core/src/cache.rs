//! Session-scoped memo of topic enrichments.

use std::collections::HashMap;

use roadmapper_shared::TopicEnrichment;

/// Enrichments keyed by topic key. Entries are never evicted within a
/// session, so a topic is requested from the service at most once.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentCache {
    entries: HashMap<String, TopicEnrichment>,
}

impl EnrichmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&TopicEnrichment> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Store an enrichment, replacing any earlier one for the same key.
    pub fn set(&mut self, key: impl Into<String>, enrichment: TopicEnrichment) {
        self.entries.insert(key.into(), enrichment);
    }

    /// Store every entry of `batch`. Returns how many keys were new.
    pub fn merge(&mut self, batch: HashMap<String, TopicEnrichment>) -> usize {
        let mut added = 0;
        for (key, enrichment) in batch {
            if self.entries.insert(key, enrichment).is_none() {
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Snapshot for persistence, sorted by key.
    pub fn to_sorted_vec(&self) -> Vec<(String, TopicEnrichment)> {
        let mut out: Vec<_> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

impl FromIterator<(String, TopicEnrichment)> for EnrichmentCache {
    fn from_iter<I: IntoIterator<Item = (String, TopicEnrichment)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enrichment(description: &str) -> TopicEnrichment {
        TopicEnrichment {
            description: description.into(),
            reference_link: "https://www.youtube.com/watch?v=abcdef".into(),
        }
    }

    #[test]
    fn set_replaces_existing_key() {
        let mut cache = EnrichmentCache::new();
        cache.set("Loops", enrichment("first"));
        cache.set("Loops", enrichment("second"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("Loops").unwrap().description, "second");
    }

    #[test]
    fn merge_counts_new_keys() {
        let mut cache = EnrichmentCache::new();
        cache.set("Loops", enrichment("old"));

        let added = cache.merge(HashMap::from([
            ("Loops".to_string(), enrichment("new")),
            ("Traits".to_string(), enrichment("t")),
        ]));

        assert_eq!(added, 1);
        assert_eq!(cache.get("Loops").unwrap().description, "new");
    }

    #[test]
    fn sorted_snapshot_reloads() {
        let cache: EnrichmentCache = [
            ("Traits".to_string(), enrichment("t")),
            ("Loops".to_string(), enrichment("l")),
        ]
        .into_iter()
        .collect();

        let snapshot = cache.to_sorted_vec();
        assert_eq!(snapshot[0].0, "Loops");

        let reloaded: EnrichmentCache = snapshot.into_iter().collect();
        assert!(reloaded.contains("Traits"));
        assert_eq!(reloaded.len(), 2);
    }
}
