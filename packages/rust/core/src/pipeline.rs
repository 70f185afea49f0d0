//! End-to-end generation flows.
//!
//! 1. Request roadmap text
//! 2. Parse it into a tree
//! 3. Validate breadth
//! 4. Enrich every node

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use roadmapper_generation::{DocumentLookup, RoadmapAuthor, TopicGenerator};
use roadmapper_shared::{AppConfig, NodeId, Result, RoadmapError, RoadmapNode, StudyDuration};

use crate::enrichment::{self, EnrichmentOptions, EnrichmentProgress, EnrichmentReport};
use crate::session::GenerationSession;
use crate::slot::GenerationSlot;
use crate::tree;

/// What to generate a roadmap for.
#[derive(Debug, Clone)]
pub struct RoadmapRequest {
    pub subject: String,
    pub duration: StudyDuration,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub enrichment: EnrichmentOptions,
    /// Fewest top-level topics a sub-roadmap may have.
    pub min_sub_roadmap_breadth: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            enrichment: EnrichmentOptions::default(),
            min_sub_roadmap_breadth: 2,
        }
    }
}

impl From<&AppConfig> for PipelineOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            enrichment: EnrichmentOptions::from(config),
            min_sub_roadmap_breadth: config.defaults.min_sub_roadmap_breadth,
        }
    }
}

/// An enriched tree and the report of its enrichment run.
#[derive(Debug, Clone)]
pub struct GeneratedRoadmap {
    pub root: RoadmapNode,
    pub report: EnrichmentReport,
}

/// The services a generation run talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub author: &'a dyn RoadmapAuthor,
    pub topics: &'a dyn TopicGenerator,
    pub documents: &'a dyn DocumentLookup,
}

impl<'a> Collaborators<'a> {
    /// All three roles served by one generator.
    pub fn new<G>(generator: &'a G) -> Self
    where
        G: RoadmapAuthor + TopicGenerator + DocumentLookup,
    {
        Self {
            author: generator,
            topics: generator,
            documents: generator,
        }
    }
}

/// Generate and enrich a roadmap for a subject.
#[instrument(skip_all, fields(subject = %request.subject, duration = %request.duration))]
pub async fn generate_roadmap(
    request: &RoadmapRequest,
    collaborators: Collaborators<'_>,
    session: &mut GenerationSession,
    options: &PipelineOptions,
    progress: &dyn EnrichmentProgress,
    cancel: &CancellationToken,
) -> Result<GeneratedRoadmap> {
    let subject = request.subject.trim();
    if subject.is_empty() {
        return Err(RoadmapError::validation("subject must not be empty"));
    }
    if request.duration.amount == 0 {
        return Err(RoadmapError::validation("duration must be at least 1"));
    }

    progress.phase("Requesting roadmap");
    let text = collaborators
        .author
        .outline(subject, &request.duration)
        .await?;

    let root = tree::parse(&text, subject)?;
    if root.children.is_empty() {
        return Err(RoadmapError::validation("roadmap has no topics"));
    }
    info!(nodes = tree::node_count(&root), "roadmap parsed");

    finish(root, collaborators, session, options, progress, cancel).await
}

/// Generate an enriched overlay tree for one node.
///
/// `node` is only read; merging the overlay is up to the caller (see
/// [`tree::attach_overlay`] and [`expand_node`]).
#[instrument(skip_all, fields(topic = %node.name))]
pub async fn generate_sub_roadmap(
    node: &RoadmapNode,
    collaborators: Collaborators<'_>,
    session: &mut GenerationSession,
    options: &PipelineOptions,
    progress: &dyn EnrichmentProgress,
    cancel: &CancellationToken,
) -> Result<GeneratedRoadmap> {
    progress.phase("Requesting sub-roadmap");
    let text = collaborators.author.expansion_outline(&node.name).await?;

    let overlay = tree::parse(&text, &node.name)?;
    if overlay.children.len() < options.min_sub_roadmap_breadth {
        return Err(RoadmapError::validation(format!(
            "sub-roadmap for '{}' has {} main topics, need at least {}",
            node.name,
            overlay.children.len(),
            options.min_sub_roadmap_breadth
        )));
    }

    finish(overlay, collaborators, session, options, progress, cancel).await
}

/// Generate a sub-roadmap for `target` and graft it under that node.
///
/// On any error `root` is left as it was.
#[instrument(skip_all, fields(target = %target))]
pub async fn expand_node(
    root: &mut RoadmapNode,
    target: NodeId,
    collaborators: Collaborators<'_>,
    session: &mut GenerationSession,
    options: &PipelineOptions,
    progress: &dyn EnrichmentProgress,
    cancel: &CancellationToken,
) -> Result<EnrichmentReport> {
    let node = tree::find(root, target)
        .cloned()
        .ok_or_else(|| RoadmapError::validation(format!("no node with id {target}")))?;

    let generated =
        generate_sub_roadmap(&node, collaborators, session, options, progress, cancel).await?;
    let added = generated.root.children.len();
    tree::attach_overlay(root, target, generated.root);

    info!(topic = %node.name, added, "sub-roadmap attached");
    Ok(generated.report)
}

/// Run [`generate_roadmap`] under a fresh ticket and publish the tree to
/// `slot` only if no newer run started meanwhile.
pub async fn generate_latest(
    slot: &GenerationSlot<RoadmapNode>,
    request: &RoadmapRequest,
    collaborators: Collaborators<'_>,
    session: &mut GenerationSession,
    options: &PipelineOptions,
    progress: &dyn EnrichmentProgress,
) -> Result<GeneratedRoadmap> {
    let ticket = slot.begin();
    let generated = generate_roadmap(
        request,
        collaborators,
        session,
        options,
        progress,
        ticket.token(),
    )
    .await?;
    slot.commit(&ticket, generated.root.clone())?;
    Ok(generated)
}

async fn finish(
    mut root: RoadmapNode,
    collaborators: Collaborators<'_>,
    session: &mut GenerationSession,
    options: &PipelineOptions,
    progress: &dyn EnrichmentProgress,
    cancel: &CancellationToken,
) -> Result<GeneratedRoadmap> {
    let report = enrichment::enrich(
        &mut root,
        session,
        collaborators.topics,
        collaborators.documents,
        &options.enrichment,
        progress,
        cancel,
    )
    .await?;
    Ok(GeneratedRoadmap { root, report })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
