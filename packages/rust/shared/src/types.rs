//! Core domain types for Roadmapper.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one roadmap node.
///
/// Assigned at parse time so that two topics sharing a display name stay
/// distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Generate a new time-sortable node identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// RoadmapNode
// ---------------------------------------------------------------------------

/// A topic in a learning roadmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapNode {
    /// Unique node identifier.
    #[serde(default)]
    pub id: NodeId,
    /// Display label. Never empty.
    pub name: String,
    /// Ordered subtopics (learning sequence).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RoadmapNode>,
    /// Short explanation, attached by enrichment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tutorial or reference URL, attached by enrichment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_link: Option<String>,
}

impl RoadmapNode {
    /// Create a leaf node with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            children: Vec::new(),
            description: None,
            reference_link: None,
        }
    }

    /// Whether enrichment has attached anything to this node.
    pub fn is_enriched(&self) -> bool {
        self.description.is_some() || self.reference_link.is_some()
    }
}

// ---------------------------------------------------------------------------
// Enrichment payloads
// ---------------------------------------------------------------------------

/// Description and reference link produced for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicEnrichment {
    pub description: String,
    pub reference_link: String,
}

/// A document returned by document lookup for a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHit {
    pub title: String,
    pub summary: String,
    pub url: String,
}

// ---------------------------------------------------------------------------
// ResourceEntry
// ---------------------------------------------------------------------------

/// Kind of learning material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Video,
    Document,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => f.write_str("Video"),
            Self::Document => f.write_str("Document"),
        }
    }
}

/// A flattened pointer to learning material, deduplicated by `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub kind: ResourceKind,
    pub title: String,
    pub summary: String,
    pub url: String,
}

impl ResourceEntry {
    /// Video resource for a topic.
    pub fn video(topic: &str, enrichment: &TopicEnrichment) -> Self {
        Self {
            kind: ResourceKind::Video,
            title: topic.to_string(),
            summary: enrichment.description.clone(),
            url: enrichment.reference_link.clone(),
        }
    }

    /// Document resource from a lookup hit.
    pub fn document(hit: &DocumentHit) -> Self {
        Self {
            kind: ResourceKind::Document,
            title: hit.title.clone(),
            summary: hit.summary.clone(),
            url: hit.url.clone(),
        }
    }

    /// Stable anchor derived from the url, for linking to a resource in a list.
    pub fn anchor_id(&self) -> String {
        let digest = Sha256::digest(self.url.as_bytes());
        format!("{digest:x}")[..16].to_string()
    }
}

// ---------------------------------------------------------------------------
// StudyDuration
// ---------------------------------------------------------------------------

/// Units offered for the study duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Minutes,
    Hours,
    Days,
    Months,
    Years,
}

impl TimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minutes => "minutes",
            Self::Hours => "hours",
            Self::Days => "days",
            Self::Months => "months",
            Self::Years => "years",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minute" | "minutes" => Ok(Self::Minutes),
            "hour" | "hours" => Ok(Self::Hours),
            "day" | "days" => Ok(Self::Days),
            "month" | "months" => Ok(Self::Months),
            "year" | "years" => Ok(Self::Years),
            other => Err(format!(
                "unknown time unit '{other}': expected minutes, hours, days, months or years"
            )),
        }
    }
}

/// How long the student plans to study a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyDuration {
    pub amount: u32,
    pub unit: TimeUnit,
}

impl fmt::Display for StudyDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.unit.as_str())
    }
}

// ---------------------------------------------------------------------------
// User profile
// ---------------------------------------------------------------------------

/// Daily reminder settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Persisted profile of the signed-in student. Holds no credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_preferences: Option<NotificationPreferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_topic: Option<String>,
    #[serde(default)]
    pub streak: u32,
    /// Minutes studied in total.
    #[serde(default)]
    pub total_study_time: u64,
    pub last_study_date: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

/// One chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub from_user: bool,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from_user: true,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from_user: false,
            timestamp: Utc::now(),
        }
    }
}

/// A tutor conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}
