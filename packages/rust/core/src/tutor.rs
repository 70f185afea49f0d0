//! Tutor conversations.
//!
//! A conversation opens with a greeting. Each user turn is appended, the
//! last few messages are sent as context, and the reply (or a fixed apology
//! when the service fails) is appended after it.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use uuid::Uuid;

use roadmapper_generation::TutorResponder;
use roadmapper_shared::{ChatMessage, Conversation};

pub const GREETING: &str = "Hi! I'm your learning assistant. How can I help you today?";

pub const APOLOGY: &str =
    "I'm sorry, I'm having trouble responding right now. Please try again.";

pub const DEFAULT_TITLE: &str = "New Question";

/// Messages sent as context with each turn, counting the new one.
const CONTEXT_MESSAGES: usize = 5;

/// Characters of the first user message kept in the title.
const TITLE_CHARS: usize = 30;

/// A fresh conversation holding only the greeting.
pub fn new_conversation(topic: Option<String>) -> Conversation {
    Conversation {
        id: Uuid::now_v7().to_string(),
        title: DEFAULT_TITLE.to_string(),
        messages: vec![ChatMessage::assistant(GREETING)],
        last_updated: Utc::now(),
        topic,
    }
}

/// `User: ...` / `Assistant: ...` transcript of the last few messages.
pub fn context_window(conversation: &Conversation) -> String {
    let skip = conversation.messages.len().saturating_sub(CONTEXT_MESSAGES);
    conversation.messages[skip..]
        .iter()
        .map(|m| {
            let speaker = if m.from_user { "User" } else { "Assistant" };
            format!("{speaker}: {}", m.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn title_from(text: &str) -> String {
    let mut title: String = text.chars().take(TITLE_CHARS).collect();
    if text.chars().count() > TITLE_CHARS {
        title.push_str("...");
    }
    title
}

/// Run one tutor turn. Blank input is ignored and yields `None`; otherwise
/// the appended reply is returned.
#[instrument(skip_all, fields(conversation = %conversation.id))]
pub async fn ask<'a>(
    conversation: &'a mut Conversation,
    text: &str,
    responder: &dyn TutorResponder,
) -> Option<&'a ChatMessage> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let first_question = !conversation.messages.iter().any(|m| m.from_user);
    conversation.messages.push(ChatMessage::user(text));
    if first_question {
        conversation.title = title_from(text);
    }

    let context = context_window(conversation);
    let reply = match responder.reply(&context, text).await {
        Ok(reply) => reply.trim().to_string(),
        Err(e) => {
            warn!(error = %e, "tutor reply failed");
            APOLOGY.to_string()
        }
    };

    conversation.messages.push(ChatMessage::assistant(reply));
    conversation.last_updated = Utc::now();
    conversation.messages.last()
}

// ---------------------------------------------------------------------------
// ConversationLog
// ---------------------------------------------------------------------------

/// All conversations, most recent first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationLog {
    conversations: Vec<Conversation>,
}

impl ConversationLog {
    pub fn new(conversations: Vec<Conversation>) -> Self {
        Self { conversations }
    }

    /// Open a new conversation at the front of the log.
    pub fn start(&mut self, topic: Option<String>) -> &mut Conversation {
        self.conversations.insert(0, new_conversation(topic));
        &mut self.conversations[0]
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    /// Most recently updated conversation.
    pub fn latest_mut(&mut self) -> Option<&mut Conversation> {
        self.conversations.iter_mut().max_by_key(|c| c.last_updated)
    }

    /// Remove a conversation. Returns `false` if the id was unknown.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        self.conversations.len() != before
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn into_inner(self) -> Vec<Conversation> {
        self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
