//! Fake collaborators shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use roadmapper_generation::{DocumentLookup, RoadmapAuthor, TopicGenerator, TutorResponder};
use roadmapper_shared::{DocumentHit, Result, RoadmapError, StudyDuration, TopicEnrichment};

use crate::enrichment::EnrichmentProgress;

/// Read a file from the workspace `fixtures/` directory.
pub fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../../fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("fixture {}: {e}", path.display()))
}

/// Deterministic stand-in for every generation service.
///
/// Topics are described as `"About {topic}"`; each lookup returns one
/// document of its own (plus a shared url when configured).
pub struct FakeGenerator {
    outline: String,
    expansion: String,
    tutor_reply: Option<String>,
    failing_topics: HashSet<String>,
    failing_lookups: HashSet<String>,
    shared_document: Option<String>,
    batches: Mutex<Vec<Vec<String>>>,
    contexts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self {
            outline: "| Basics\n|| Syntax\n| Advanced".into(),
            expansion: "| Part A\n| Part B".into(),
            tutor_reply: Some("Here is an explanation.".into()),
            failing_topics: HashSet::new(),
            failing_lookups: HashSet::new(),
            shared_document: None,
            batches: Mutex::new(Vec::new()),
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_outline(mut self, text: &str) -> Self {
        self.outline = text.into();
        self
    }

    pub fn with_expansion(mut self, text: &str) -> Self {
        self.expansion = text.into();
        self
    }

    pub fn with_tutor_reply(mut self, text: &str) -> Self {
        self.tutor_reply = Some(text.into());
        self
    }

    pub fn failing_tutor(mut self) -> Self {
        self.tutor_reply = None;
        self
    }

    /// Any batch containing `topic` fails.
    pub fn failing_topic(mut self, topic: &str) -> Self {
        self.failing_topics.insert(topic.into());
        self
    }

    pub fn failing_lookup(mut self, topic: &str) -> Self {
        self.failing_lookups.insert(topic.into());
        self
    }

    /// Every lookup also returns a document at `url`.
    pub fn shared_document(mut self, url: &str) -> Self {
        self.shared_document = Some(url.into());
        self
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }

    /// Every topic sent to `describe_topics`, in request order.
    pub fn described_topics(&self) -> Vec<String> {
        self.batches().into_iter().flatten().collect()
    }

    pub fn tutor_contexts(&self) -> Vec<String> {
        self.contexts.lock().unwrap().clone()
    }
}

fn slug(topic: &str) -> String {
    topic.replace(' ', "-")
}

#[async_trait]
impl RoadmapAuthor for FakeGenerator {
    async fn outline(&self, _subject: &str, _duration: &StudyDuration) -> Result<String> {
        Ok(self.outline.clone())
    }

    async fn expansion_outline(&self, _topic: &str) -> Result<String> {
        Ok(self.expansion.clone())
    }
}

#[async_trait]
impl TopicGenerator for FakeGenerator {
    async fn describe_topics(&self, topics: &[String]) -> Result<HashMap<String, TopicEnrichment>> {
        self.batches.lock().unwrap().push(topics.to_vec());
        if topics.iter().any(|t| self.failing_topics.contains(t)) {
            return Err(RoadmapError::Transport("HTTP 500: batch failed".into()));
        }
        Ok(topics
            .iter()
            .map(|t| {
                (
                    t.clone(),
                    TopicEnrichment {
                        description: format!("About {t}"),
                        reference_link: format!("https://videos.test/{}", slug(t)),
                    },
                )
            })
            .collect())
    }
}

#[async_trait]
impl DocumentLookup for FakeGenerator {
    async fn lookup_documents(&self, topic: &str) -> Result<Vec<DocumentHit>> {
        if self.failing_lookups.contains(topic) {
            return Err(RoadmapError::Transport("connection reset".into()));
        }
        let mut hits = vec![DocumentHit {
            title: format!("{topic} guide"),
            summary: format!("Guide to {topic}"),
            url: format!("https://docs.test/{}", slug(topic)),
        }];
        if let Some(url) = &self.shared_document {
            hits.push(DocumentHit {
                title: format!("Shared ({topic})"),
                summary: "Shared reference".into(),
                url: url.clone(),
            });
        }
        Ok(hits)
    }
}

#[async_trait]
impl TutorResponder for FakeGenerator {
    async fn reply(&self, context: &str, _message: &str) -> Result<String> {
        self.contexts.lock().unwrap().push(context.to_string());
        self.tutor_reply
            .clone()
            .ok_or_else(|| RoadmapError::Transport("HTTP 503: unavailable".into()))
    }
}

/// Records progress callbacks.
#[derive(Default)]
pub struct FakeProgress {
    phases: Mutex<Vec<String>>,
    ticks: Mutex<Vec<(usize, usize)>>,
}

impl FakeProgress {
    pub fn phases(&self) -> Vec<String> {
        self.phases.lock().unwrap().clone()
    }

    pub fn ticks(&self) -> Vec<(usize, usize)> {
        self.ticks.lock().unwrap().clone()
    }
}

impl EnrichmentProgress for FakeProgress {
    fn phase(&self, name: &str) {
        self.phases.lock().unwrap().push(name.to_string());
    }

    fn task_progress(&self, current: usize, total: usize, _detail: &str) {
        self.ticks.lock().unwrap().push((current, total));
    }
}
