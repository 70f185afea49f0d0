//! Per-session generation state.

use crate::cache::EnrichmentCache;
use crate::resources::ResourceCollection;

/// State that outlives a single generation run: the enrichment memo and
/// the collected resources. One session is owned by one caller at a time.
#[derive(Debug, Default)]
pub struct GenerationSession {
    pub cache: EnrichmentCache,
    pub resources: ResourceCollection,
}

impl GenerationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session seeded with a previously persisted cache.
    pub fn with_cache(cache: EnrichmentCache) -> Self {
        Self {
            cache,
            resources: ResourceCollection::new(),
        }
    }
}
