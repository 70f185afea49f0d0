//! Roadmap domain logic for Roadmapper.
//!
//! Parses depth-marked outlines into trees, enriches every topic through the
//! generation collaborators, and keeps per-session caches and resources.
//! The end-to-end flows live in [`pipeline`].

pub mod cache;
pub mod enrichment;
pub mod pipeline;
pub mod resources;
pub mod session;
pub mod slot;
pub mod tree;
pub mod tutor;

#[cfg(test)]
mod testing;

pub use cache::EnrichmentCache;
pub use enrichment::{
    EnrichmentOptions, EnrichmentProgress, EnrichmentReport, SilentEnrichmentProgress,
};
pub use pipeline::{Collaborators, GeneratedRoadmap, PipelineOptions, RoadmapRequest};
pub use resources::ResourceCollection;
pub use session::GenerationSession;
pub use slot::{GenerationSlot, GenerationTicket};
pub use tutor::ConversationLog;
