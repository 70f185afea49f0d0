//! Prompt templates sent to the generation service.

use roadmapper_shared::StudyDuration;

/// Outline for a whole subject.
pub(crate) fn roadmap_prompt(subject: &str, duration: &StudyDuration) -> String {
    format!(
        r#"Create a learning roadmap for "{subject}" ({duration}). Format as a tree with | for depth.
Keep it simple and focused on core concepts.

Example format:
| Basics
|| Core Concept 1
||| Detail 1
|| Core Concept 2
| Advanced
|| Topic 1

Rules:
- 2-4 main topics (level 1)
- 1-2 subtopics each (level 2)
- 1-1 details each (level 3)
- Keep names short and clear
- Focus on core concepts
- Order by learning sequence

Roadmap:"#
    )
}

/// Detailed outline for one topic of an existing roadmap.
pub(crate) fn sub_roadmap_prompt(topic: &str) -> String {
    format!(
        r#"Create a detailed learning roadmap for "{topic}". Format as a tree with | for depth.
Break down the topic into specific concepts and implementation details.

Example format:
| Fundamentals
|| Basic Concept 1
||| Key Point 1
||| Key Point 2
|| Basic Concept 2
| Advanced Topics
|| Advanced Concept 1
||| Implementation Detail 1

Rules:
- Start with fundamentals
- Include 2-3 main categories
- Each category should have 2-3 key concepts
- Each concept should have 2-3 specific points
- Use clear, concise names
- Order from basic to advanced
- Keep it focused on "{topic}" specifically

Roadmap:"#
    )
}

/// One description and video id per topic, `|||`-separated.
pub(crate) fn topic_batch_prompt(topics: &[String]) -> String {
    format!(
        r#"For each topic, provide a one-line description and YouTube video ID.
Format: topic|||description|||videoId

Topics:
{}

Response format example:
JavaScript|||Learn the basics of web programming|||dQw4w9WgXcQ"#,
        topics.join("\n")
    )
}

/// Three free documents for a topic, `|||`-separated.
pub(crate) fn documents_prompt(topic: &str) -> String {
    format!(
        r#"Find 3 free, high-quality document resources (PDFs, articles, or documentation) for learning "{topic}".
Format each resource as: title|||description|||link

Guidelines:
- Choose reputable sources (GitHub, official docs, academic papers)
- Focus on free, publicly available resources
- Include a mix of beginner and intermediate content

Example format:
JavaScript Documentation|||Official MDN Web Docs for JavaScript|||https://developer.mozilla.org/en-US/docs/Web/JavaScript"#
    )
}

/// Tutor turn with recent conversation context.
pub(crate) fn tutor_prompt(context: &str, message: &str) -> String {
    format!(
        "You are a helpful learning assistant focused on explaining concepts and answering questions. Your role is to:\n\
1. Provide clear, concise explanations\n\
2. Use examples when helpful\n\
3. Break down complex topics\n\
4. Answer specific questions\n\
5. Suggest learning resources when relevant\n\n\
Here's the recent conversation context:\n\n{context}\n\nUser: {message}\n\n\
Provide a helpful, educational response that maintains context:"
    )
}
