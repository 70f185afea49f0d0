//! Batched topic enrichment.
//!
//! Every node of a roadmap gets a description and a video link. Topics are
//! sent to the [`TopicGenerator`] in fixed-size batches, and for each topic
//! in a batch a [`DocumentLookup`] runs concurrently. Results are memoized
//! in the session cache by topic key and written back onto nodes by id.
//!
//! A failed batch or lookup is logged and skipped; the affected nodes keep
//! their empty fields and the run carries on.

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use roadmapper_generation::{DocumentLookup, TopicGenerator};
use roadmapper_shared::{AppConfig, NodeId, ResourceEntry, Result, RoadmapError, RoadmapNode};

use crate::session::GenerationSession;
use crate::tree;

/// Default number of topics per generation request.
pub const DEFAULT_BATCH_SIZE: usize = 8;

// ---------------------------------------------------------------------------
// Options and report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EnrichmentOptions {
    /// Topics per request. Zero is treated as one.
    pub batch_size: usize,
}

impl Default for EnrichmentOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl From<&AppConfig> for EnrichmentOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            batch_size: config.defaults.batch_size,
        }
    }
}

/// What an enrichment run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    /// Distinct topic keys in the tree.
    pub topics: usize,
    /// Keys already in the cache before the run.
    pub cache_hits: usize,
    /// Batches sent to the generator.
    pub batches: usize,
    /// Batches whose generation request failed.
    pub failed_batches: usize,
    /// Document lookups that failed.
    pub failed_lookups: usize,
    /// Resource urls added to the session.
    pub resources_added: usize,
    /// Nodes that carry an enrichment after the run.
    pub enriched_nodes: usize,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for enrichment.
pub trait EnrichmentProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each batch.
    fn task_progress(&self, current: usize, total: usize, detail: &str);
}

/// No-op progress for headless and test usage.
pub struct SilentEnrichmentProgress;

impl EnrichmentProgress for SilentEnrichmentProgress {
    fn phase(&self, _name: &str) {}
    fn task_progress(&self, _current: usize, _total: usize, _detail: &str) {}
}

// ---------------------------------------------------------------------------
// Topic keys
// ---------------------------------------------------------------------------

/// Cache key for every node, in pre-order.
///
/// A node's key is its name, unless another node in the same tree shares the
/// name; then it becomes `"Name (Parent)"` so the two are enriched separately.
pub fn topic_keys(root: &RoadmapNode) -> Vec<(NodeId, String)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for node in tree::flatten(root) {
        *counts.entry(node.name.as_str()).or_default() += 1;
    }

    fn walk(
        node: &RoadmapNode,
        parent: Option<&str>,
        counts: &HashMap<&str, usize>,
        out: &mut Vec<(NodeId, String)>,
    ) {
        let key = match parent {
            Some(parent) if counts.get(node.name.as_str()).copied().unwrap_or(0) > 1 => {
                format!("{} ({parent})", node.name)
            }
            _ => node.name.clone(),
        };
        out.push((node.id, key));
        for child in &node.children {
            walk(child, Some(&node.name), counts, out);
        }
    }

    let mut out = Vec::new();
    walk(root, None, &counts, &mut out);
    out
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Enrich every node of `root` in place.
///
/// Keys already present in the session cache are never sent again. Returns
/// [`RoadmapError::Cancelled`] if `cancel` fires between batches; enrichments
/// gathered before that stay in the cache but are not applied to the tree.
#[instrument(skip_all, fields(root = %root.name, batch_size = options.batch_size))]
pub async fn enrich(
    root: &mut RoadmapNode,
    session: &mut GenerationSession,
    topics: &dyn TopicGenerator,
    documents: &dyn DocumentLookup,
    options: &EnrichmentOptions,
    progress: &dyn EnrichmentProgress,
    cancel: &CancellationToken,
) -> Result<EnrichmentReport> {
    let keys = topic_keys(root);
    let mut report = EnrichmentReport::default();

    let mut seen = HashSet::new();
    let mut pending = Vec::new();
    for (_, key) in &keys {
        if !seen.insert(key.as_str()) {
            continue;
        }
        report.topics += 1;
        if session.cache.contains(key) {
            report.cache_hits += 1;
        } else {
            pending.push(key.clone());
        }
    }

    progress.phase("Enriching topics");
    let batch_size = options.batch_size.max(1);
    let total_batches = pending.len().div_ceil(batch_size);

    for (i, batch) in pending.chunks(batch_size).enumerate() {
        if cancel.is_cancelled() {
            info!(completed = i, total_batches, "enrichment cancelled");
            return Err(RoadmapError::Cancelled);
        }

        let (described, looked_up) = tokio::join!(
            topics.describe_topics(batch),
            join_all(batch.iter().map(|topic| documents.lookup_documents(topic))),
        );
        report.batches += 1;

        let mut found = Vec::new();
        match described {
            Ok(map) => {
                debug!(requested = batch.len(), returned = map.len(), "batch described");
                found.extend(map.iter().map(|(topic, e)| ResourceEntry::video(topic, e)));
                session.cache.merge(map);
            }
            Err(e) => {
                report.failed_batches += 1;
                warn!(batch = i + 1, error = %e, "topic batch failed");
            }
        }

        for (topic, hits) in batch.iter().zip(looked_up) {
            match hits {
                Ok(hits) => found.extend(hits.iter().map(ResourceEntry::document)),
                Err(e) => {
                    report.failed_lookups += 1;
                    warn!(topic = %topic, error = %e, "document lookup failed");
                }
            }
        }
        report.resources_added += session.resources.extend(found);

        progress.task_progress(
            (i * batch_size + batch.len()).min(pending.len()),
            pending.len(),
            &format!("batch {}/{total_batches}", i + 1),
        );
    }

    if cancel.is_cancelled() {
        return Err(RoadmapError::Cancelled);
    }

    report.enriched_nodes = apply(root, &keys, session);

    info!(
        topics = report.topics,
        cache_hits = report.cache_hits,
        batches = report.batches,
        failed_batches = report.failed_batches,
        resources_added = report.resources_added,
        enriched_nodes = report.enriched_nodes,
        "enrichment complete"
    );

    Ok(report)
}

/// Copy cached enrichments onto nodes. Returns how many nodes are enriched.
fn apply(root: &mut RoadmapNode, keys: &[(NodeId, String)], session: &GenerationSession) -> usize {
    let by_id: HashMap<NodeId, &str> = keys.iter().map(|(id, k)| (*id, k.as_str())).collect();
    let mut enriched = 0;

    tree::for_each_mut(root, &mut |node| {
        let cached = by_id
            .get(&node.id)
            .and_then(|key| session.cache.get(key));
        if let Some(enrichment) = cached {
            node.description = Some(enrichment.description.clone());
            node.reference_link = Some(enrichment.reference_link.clone());
        }
        if node.is_enriched() {
            enriched += 1;
        }
    });

    enriched
}

/// Gather resources for a single topic outside of a full run.
///
/// Describes the topic and looks up its documents concurrently, caches the
/// description, and adds everything to the session. Failures are logged and
/// yield fewer resources. Returns how many new resource urls were added.
#[instrument(skip_all, fields(topic = %node.name))]
pub async fn collect_node_resources(
    node: &RoadmapNode,
    session: &mut GenerationSession,
    topics: &dyn TopicGenerator,
    documents: &dyn DocumentLookup,
) -> usize {
    let names = [node.name.clone()];
    let (described, looked_up) = tokio::join!(
        topics.describe_topics(&names),
        documents.lookup_documents(&node.name),
    );

    let mut found = Vec::new();
    match described {
        Ok(map) => {
            found.extend(map.iter().map(|(topic, e)| ResourceEntry::video(topic, e)));
            session.cache.merge(map);
        }
        Err(e) => warn!(error = %e, "topic description failed"),
    }
    match looked_up {
        Ok(hits) => found.extend(hits.iter().map(ResourceEntry::document)),
        Err(e) => warn!(error = %e, "document lookup failed"),
    }

    session.resources.extend(found)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
