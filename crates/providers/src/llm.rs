//! LLM-backed collaborators: relevance judge, summarizer, question generator
//! and explanation generator, all driven through one [`Chat`] client.
//!
//! Replies that must be JSON are extracted from either a fenced code block or
//! the outermost `{...}` in the text. Structural validation of question
//! batches is left to the workflow; this module only parses.

use async_trait::async_trait;
use autolearn_core::error::CollaboratorError;
use autolearn_core::ports::{
    ExplanationGenerator, QuestionGenerator, Relevance, RelevanceJudge, Summarizer,
};
use autolearn_core::session::Question;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::openai_compat::Chat;

const RELEVANCE_SYSTEM: &str = "You are a context validation expert. Your task is to determine \
if the provided context is relevant to the learning objectives of a topic.";

const SUMMARY_SYSTEM: &str = "You are an educator. Create a concise, structured, and engaging \
study summary for the given topic based strictly on the provided context. Use bullet points and \
bold text for key terms.";

const QUESTIONS_SYSTEM: &str = "You are an educator. Generate 3-5 Multiple Choice Questions \
(MCQs) based strictly on the provided context. Each question must have exactly 4 options and one \
clearly correct index. Return as JSON.";

const QUESTIONS_FORMAT: &str = "Respond with JSON only, in this shape: \
{\"mcqs\": [{\"question\": \"...\", \"options\": [\"A\", \"B\", \"C\", \"D\"], \"correct_index\": 0}]}. \
correct_index is zero-based.";

const EXPLAIN_SYSTEM: &str = "You are a master educator using the Feynman Technique. \
Transform complex information into something a 10-year-old could explain to their friends, \
using the Primary Context and the Simplified Web Context.

Structure your response as follows:
1. **The Core Idea**: one sentence with no technical terms.
2. **The Everyday Analogy**: compare the concept to something very common.
3. **How it Works**: explain the mechanism through the analogy.
4. **Quick Recap**: a simple takeaway.

No jargon. Encouraging tone. At most 250 words.";

/// All four LLM-backed ports over a shared chat client.
pub struct LlmCollaborators {
    chat: Arc<dyn Chat>,
}

impl LlmCollaborators {
    pub fn new(chat: Arc<dyn Chat>) -> Self {
        Self { chat }
    }

    async fn ask(&self, port: &str, system: &str, user: &str) -> Result<String, CollaboratorError> {
        debug!(port, chat = self.chat.name(), "LLM collaborator call");
        self.chat.complete(system, user).await
    }
}

/// Extract the JSON object embedded in a model reply.
pub fn extract_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            let inner = body[..end].trim();
            if inner.starts_with('{') || inner.starts_with('[') {
                return Some(inner);
            }
        }
    }

    let open = trimmed.find('{')?;
    let close = trimmed.rfind('}')?;
    (close > open).then(|| &trimmed[open..=close])
}

#[derive(Debug, Deserialize)]
struct RelevanceReply {
    #[serde(default)]
    score: serde_json::Value,
    #[serde(default)]
    is_relevant: serde_json::Value,
}

fn number_from(value: &serde_json::Value) -> f64 {
    match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn bool_from(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Parse the relevance judge's `{"score": .., "is_relevant": ..}` reply.
pub fn parse_relevance(reply: &str) -> Result<Relevance, CollaboratorError> {
    let json = extract_json(reply)
        .ok_or_else(|| CollaboratorError::InvalidResponse("relevance reply has no JSON".into()))?;
    let parsed: RelevanceReply = serde_json::from_str(json)
        .map_err(|e| CollaboratorError::InvalidResponse(format!("relevance reply: {e}")))?;
    Ok(Relevance::new(
        bool_from(&parsed.is_relevant),
        number_from(&parsed.score),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuestionsReply {
    Wrapped { mcqs: Vec<RawQuestion> },
    Bare(Vec<RawQuestion>),
}

/// A question as the model wrote it. The index is taken as any JSON value so
/// that a negative or fractional one reaches batch validation instead of
/// failing the whole reply.
#[derive(Debug, Deserialize)]
struct RawQuestion {
    question: String,
    options: Vec<String>,
    correct_index: serde_json::Value,
}

impl From<RawQuestion> for Question {
    fn from(raw: RawQuestion) -> Self {
        // Not an option index: never in range, so validation rejects it.
        let correct_index = match raw.correct_index.as_u64() {
            Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
            None => {
                debug!(question = %raw.question, correct_index = %raw.correct_index, "Unusable correct_index");
                usize::MAX
            }
        };
        Self {
            question: raw.question,
            options: raw.options,
            correct_index,
        }
    }
}

/// Parse a question batch from `{"mcqs": [...]}` or a bare array.
pub fn parse_questions(reply: &str) -> Result<Vec<Question>, CollaboratorError> {
    let trimmed = reply.trim();
    let json = if trimmed.starts_with('[') {
        trimmed
    } else {
        extract_json(trimmed).ok_or_else(|| {
            CollaboratorError::InvalidResponse("question reply has no JSON".into())
        })?
    };
    let parsed: QuestionsReply = serde_json::from_str(json)
        .map_err(|e| CollaboratorError::InvalidResponse(format!("question reply: {e}")))?;
    let raw = match parsed {
        QuestionsReply::Wrapped { mcqs } => mcqs,
        QuestionsReply::Bare(mcqs) => mcqs,
    };
    Ok(raw.into_iter().map(Question::from).collect())
}

fn avoid_block(avoid: &BTreeSet<String>) -> String {
    if avoid.is_empty() {
        return String::new();
    }
    let listed: Vec<&str> = avoid.iter().map(String::as_str).collect();
    format!(
        "\nCRITICAL: DO NOT use any of these questions as they have already been used: {listed:?}. \
         Focus on different nuances or aspects of the topic."
    )
}

#[async_trait]
impl RelevanceJudge for LlmCollaborators {
    fn name(&self) -> &str {
        "llm"
    }

    async fn score(
        &self,
        topic: &str,
        objectives: &[String],
        context: &str,
    ) -> Result<Relevance, CollaboratorError> {
        let user = format!(
            "Topic: {topic}\nObjectives: {}\n\nGathered Context: {context}\n\n\
             Assess how relevant and sufficient this context is (0-100%). \
             Respond in JSON format: {{\"score\": <score>, \"is_relevant\": <true/false>}}",
            objectives.join(", ")
        );
        let reply = self.ask("relevance", RELEVANCE_SYSTEM, &user).await?;
        parse_relevance(&reply)
    }
}

#[async_trait]
impl Summarizer for LlmCollaborators {
    fn name(&self) -> &str {
        "llm"
    }

    async fn summarize(&self, context: &str, topic: &str) -> Result<String, CollaboratorError> {
        let user = format!("Topic: {topic}\nContext: {context}");
        let reply = self.ask("summarizer", SUMMARY_SYSTEM, &user).await?;
        Ok(reply.trim().to_string())
    }
}

#[async_trait]
impl QuestionGenerator for LlmCollaborators {
    fn name(&self) -> &str {
        "llm"
    }

    async fn generate(
        &self,
        context: &str,
        topic: &str,
        avoid: &BTreeSet<String>,
    ) -> Result<Vec<Question>, CollaboratorError> {
        let user = format!(
            "Topic: {topic}\nContext: {context}{}\n\n{QUESTIONS_FORMAT}",
            avoid_block(avoid)
        );
        let reply = self.ask("questions", QUESTIONS_SYSTEM, &user).await?;
        parse_questions(&reply)
    }
}

#[async_trait]
impl ExplanationGenerator for LlmCollaborators {
    fn name(&self) -> &str {
        "llm"
    }

    async fn explain(
        &self,
        question: &str,
        primary_context: &str,
        simple_context: &str,
    ) -> Result<String, CollaboratorError> {
        let user = format!(
            "Topic: {question}\nPrimary Context: {primary_context}\nSimplified Web Context: {simple_context}"
        );
        let reply = self.ask("explainer", EXPLAIN_SYSTEM, &user).await?;
        Ok(reply.trim().to_string())
    }
}
