//! Shared types, error model, and configuration for Roadmapper.
//!
//! This crate is the foundation depended on by all other Roadmapper crates.
//! It provides:
//! - [`RoadmapError`]: the unified error type
//! - Domain types ([`RoadmapNode`], [`ResourceEntry`], [`StudyDuration`], [`Conversation`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CohereConfig, DefaultsConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, resolve_api_key, validate_api_key,
};
pub use error::{Result, RoadmapError};
pub use types::{
    ChatMessage, Conversation, DocumentHit, NodeId, NotificationPreferences, ResourceEntry,
    ResourceKind, RoadmapNode, StudyDuration, TimeUnit, TopicEnrichment, UserProfile,
};
