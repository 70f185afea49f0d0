//! Text-generation collaborators for Roadmapper.
//!
//! The roadmap core never talks HTTP directly. It depends on the traits
//! defined here ([`RoadmapAuthor`], [`TopicGenerator`], [`DocumentLookup`],
//! [`TutorResponder`]); [`LlmGenerator`] implements all of them on top of any
//! [`TextCompletion`], and [`CohereClient`] is the production completion.

mod client;
mod prompts;
pub mod records;

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, instrument};

use roadmapper_shared::{
    AppConfig, DocumentHit, Result, RoadmapError, StudyDuration, TopicEnrichment,
};

pub use client::{ClientOptions, CohereClient, CompletionRequest, TextCompletion};

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Produces raw roadmap outlines in the depth-marker grammar.
#[async_trait]
pub trait RoadmapAuthor: Send + Sync {
    /// Outline for a whole subject studied over `duration`.
    async fn outline(&self, subject: &str, duration: &StudyDuration) -> Result<String>;

    /// Detailed outline for a single topic.
    async fn expansion_outline(&self, topic: &str) -> Result<String>;
}

/// Describes a batch of topics in one request.
#[async_trait]
pub trait TopicGenerator: Send + Sync {
    /// Map of topic → enrichment. Topics the service skipped are absent.
    async fn describe_topics(&self, topics: &[String]) -> Result<HashMap<String, TopicEnrichment>>;
}

/// Finds reference documents for one topic.
#[async_trait]
pub trait DocumentLookup: Send + Sync {
    async fn lookup_documents(&self, topic: &str) -> Result<Vec<DocumentHit>>;
}

/// Answers a tutor question given prior conversation context.
#[async_trait]
pub trait TutorResponder: Send + Sync {
    async fn reply(&self, context: &str, message: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// LlmGenerator
// ---------------------------------------------------------------------------

/// Models used for each kind of request.
#[derive(Debug, Clone)]
pub struct GeneratorModels {
    /// Roadmap outlines.
    pub roadmap: String,
    /// Sub-roadmaps, topic batches, documents and tutor replies.
    pub enrichment: String,
}

impl From<&AppConfig> for GeneratorModels {
    fn from(config: &AppConfig) -> Self {
        Self {
            roadmap: config.cohere.roadmap_model.clone(),
            enrichment: config.cohere.enrichment_model.clone(),
        }
    }
}

/// Prompt-driven implementation of every collaborator trait.
pub struct LlmGenerator<C> {
    completion: C,
    models: GeneratorModels,
}

impl<C: TextCompletion> LlmGenerator<C> {
    pub fn new(completion: C, models: GeneratorModels) -> Self {
        Self { completion, models }
    }
}

impl LlmGenerator<CohereClient> {
    /// Production generator wired from the app config.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            CohereClient::from_config(config)?,
            GeneratorModels::from(config),
        ))
    }
}

fn non_empty(text: String, what: &str) -> Result<String> {
    if text.trim().is_empty() {
        Err(RoadmapError::format(format!("empty {what} received")))
    } else {
        Ok(text)
    }
}

#[async_trait]
impl<C: TextCompletion> RoadmapAuthor for LlmGenerator<C> {
    #[instrument(skip_all, fields(subject = %subject, duration = %duration))]
    async fn outline(&self, subject: &str, duration: &StudyDuration) -> Result<String> {
        let request = CompletionRequest::new(
            &self.models.roadmap,
            prompts::roadmap_prompt(subject, duration),
            300,
        )
        .with_stop("\n\n");
        non_empty(self.completion.complete(&request).await?, "roadmap")
    }

    #[instrument(skip_all, fields(topic = %topic))]
    async fn expansion_outline(&self, topic: &str) -> Result<String> {
        let request = CompletionRequest::new(
            &self.models.enrichment,
            prompts::sub_roadmap_prompt(topic),
            500,
        )
        .with_temperature(0.8)
        .with_stop("\n\n");
        non_empty(self.completion.complete(&request).await?, "sub-roadmap")
    }
}

#[async_trait]
impl<C: TextCompletion> TopicGenerator for LlmGenerator<C> {
    #[instrument(skip_all, fields(topics = topics.len()))]
    async fn describe_topics(&self, topics: &[String]) -> Result<HashMap<String, TopicEnrichment>> {
        if topics.is_empty() {
            return Ok(HashMap::new());
        }
        let request = CompletionRequest::new(
            &self.models.enrichment,
            prompts::topic_batch_prompt(topics),
            300,
        );
        let text = self.completion.complete(&request).await?;
        let records = records::parse_topic_records(&text, topics);
        debug!(requested = topics.len(), parsed = records.len(), "topic batch parsed");
        Ok(records)
    }
}

#[async_trait]
impl<C: TextCompletion> DocumentLookup for LlmGenerator<C> {
    #[instrument(skip_all, fields(topic = %topic))]
    async fn lookup_documents(&self, topic: &str) -> Result<Vec<DocumentHit>> {
        let request =
            CompletionRequest::new(&self.models.enrichment, prompts::documents_prompt(topic), 300);
        let text = self.completion.complete(&request).await?;
        Ok(records::parse_document_records(&text))
    }
}

#[async_trait]
impl<C: TextCompletion> TutorResponder for LlmGenerator<C> {
    async fn reply(&self, context: &str, message: &str) -> Result<String> {
        let request = CompletionRequest::new(
            &self.models.enrichment,
            prompts::tutor_prompt(context, message),
            300,
        );
        non_empty(self.completion.complete(&request).await?, "tutor reply")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use roadmapper_shared::TimeUnit;
    use std::sync::Mutex;

    /// Replays canned text and records every request.
    struct Scripted {
        reply: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl Scripted {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.into(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextCompletion for Scripted {
        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.reply.clone())
        }
    }

    fn models() -> GeneratorModels {
        GeneratorModels {
            roadmap: "command-r-plus".into(),
            enrichment: "command".into(),
        }
    }

    #[tokio::test]
    async fn outline_uses_roadmap_model() {
        let generator = LlmGenerator::new(Scripted::new("| Basics"), models());
        let duration = StudyDuration {
            amount: 3,
            unit: TimeUnit::Hours,
        };
        let text = generator.outline("Rust", &duration).await.unwrap();
        assert_eq!(text, "| Basics");

        let seen = generator.completion.seen.lock().unwrap();
        assert_eq!(seen[0].model, "command-r-plus");
        assert_eq!(seen[0].stop_sequences, vec!["\n\n".to_string()]);
        assert!(seen[0].prompt.contains("(3 hours)"));
    }

    #[tokio::test]
    async fn empty_outline_is_format_error() {
        let generator = LlmGenerator::new(Scripted::new("   "), models());
        let err = generator.expansion_outline("Loops").await.unwrap_err();
        assert!(matches!(err, RoadmapError::Format { .. }));
    }

    #[tokio::test]
    async fn describe_topics_parses_records() {
        let generator = LlmGenerator::new(
            Scripted::new("Loops|||Repeat work|||abcdef123\nbad line"),
            models(),
        );
        let map = generator
            .describe_topics(&["Loops".into(), "Traits".into()])
            .await
            .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["Loops"].description, "Repeat work");
    }

    #[tokio::test]
    async fn describe_topics_keys_numbered_names_as_requested() {
        let generator = LlmGenerator::new(
            Scripted::new("1. Basics|||Start here|||dQw4w9WgXcQ"),
            models(),
        );
        let map = generator
            .describe_topics(&["1. Basics".into()])
            .await
            .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["1. Basics"].description, "Start here");
    }

    #[tokio::test]
    async fn describe_no_topics_skips_request() {
        let generator = LlmGenerator::new(Scripted::new("unused"), models());
        let map = generator.describe_topics(&[]).await.unwrap();
        assert!(map.is_empty());
        assert!(generator.completion.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn lookup_documents_filters_links() {
        let generator = LlmGenerator::new(
            Scripted::new("Book|||Free book|||https://doc.rust-lang.org/book/\nNope|||x|||y"),
            models(),
        );
        let docs = generator.lookup_documents("Rust").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].url, "https://doc.rust-lang.org/book/");
    }
}
