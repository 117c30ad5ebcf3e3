//! Deterministic offline collaborators.
//!
//! Every port returns fixed, input-derived values with no network access.
//! Selected with `collaborators.mode = "offline"`; also handy for demos and
//! end-to-end tests where the content does not matter but the workflow does.

use async_trait::async_trait;
use autolearn_core::error::CollaboratorError;
use autolearn_core::ports::{
    ContextSource, ExplanationGenerator, QuestionGenerator, Relevance, RelevanceJudge, Summarizer,
};
use autolearn_core::session::{OPTIONS_PER_QUESTION, Question};
use std::collections::BTreeSet;

/// Number of questions in every offline batch.
pub const OFFLINE_BATCH_SIZE: usize = 3;

/// Offline implementation of all five ports.
#[derive(Debug, Default, Clone)]
pub struct OfflineCollaborators;

impl OfflineCollaborators {
    pub fn new() -> Self {
        Self
    }

    fn question(topic: &str, aspect: &str, round: usize, slot: usize) -> Question {
        let correct = format!("{aspect} is part of {topic}");
        let distractors = [
            format!("{aspect} has nothing to do with {topic}"),
            format!("{aspect} was removed from {topic}"),
            format!("{aspect} only applies outside {topic}"),
        ];
        let correct_index = (round + slot) % OPTIONS_PER_QUESTION;

        let mut options: Vec<String> = distractors.to_vec();
        options.insert(correct_index, correct);

        Question {
            question: format!("[{topic} round {round}, item {}] Which statement about {aspect} is true?", slot + 1),
            options,
            correct_index,
        }
    }
}

#[async_trait]
impl ContextSource for OfflineCollaborators {
    fn name(&self) -> &str {
        "offline"
    }

    async fn search_notes(&self, _topic: &str) -> Result<String, CollaboratorError> {
        Ok(String::new())
    }

    async fn search_web(
        &self,
        topic: &str,
        objectives: &[String],
    ) -> Result<String, CollaboratorError> {
        let mut text = format!("{topic}: study notes.\n");
        for objective in objectives {
            text.push_str(&format!("- {objective} is part of {topic}.\n"));
        }
        Ok(text)
    }

    async fn search_simple_explanation(&self, concept: &str) -> Result<String, CollaboratorError> {
        Ok(format!("Think of \"{concept}\" like sorting toys into labelled boxes."))
    }
}

#[async_trait]
impl RelevanceJudge for OfflineCollaborators {
    fn name(&self) -> &str {
        "offline"
    }

    /// Share of objectives mentioned in the context; relevant at 50% or more.
    async fn score(
        &self,
        _topic: &str,
        objectives: &[String],
        context: &str,
    ) -> Result<Relevance, CollaboratorError> {
        if context.trim().is_empty() {
            return Ok(Relevance::irrelevant());
        }
        if objectives.is_empty() {
            return Ok(Relevance::new(true, 100.0));
        }
        let haystack = context.to_lowercase();
        let covered = objectives
            .iter()
            .filter(|o| haystack.contains(&o.to_lowercase()))
            .count();
        let score = covered as f64 / objectives.len() as f64 * 100.0;
        Ok(Relevance::new(score >= 50.0, score))
    }
}

#[async_trait]
impl Summarizer for OfflineCollaborators {
    fn name(&self) -> &str {
        "offline"
    }

    async fn summarize(&self, context: &str, topic: &str) -> Result<String, CollaboratorError> {
        let mut summary = format!("# {topic}\n");
        for line in context.lines().map(str::trim).filter(|l| !l.is_empty()).take(5) {
            summary.push_str("- ");
            summary.push_str(line.trim_start_matches("- "));
            summary.push('\n');
        }
        Ok(summary)
    }
}

#[async_trait]
impl QuestionGenerator for OfflineCollaborators {
    fn name(&self) -> &str {
        "offline"
    }

    async fn generate(
        &self,
        context: &str,
        topic: &str,
        avoid: &BTreeSet<String>,
    ) -> Result<Vec<Question>, CollaboratorError> {
        let mut aspects: Vec<&str> = context
            .lines()
            .filter_map(|l| l.trim().strip_prefix("- "))
            .map(|l| l.split(" is part of").next().unwrap_or(l).trim())
            .filter(|l| !l.is_empty())
            .collect();
        if aspects.is_empty() {
            aspects.push(topic);
        }

        let mut round = avoid.len() / OFFLINE_BATCH_SIZE + 1;
        loop {
            let batch: Vec<Question> = (0..OFFLINE_BATCH_SIZE)
                .map(|slot| Self::question(topic, aspects[(round + slot) % aspects.len()], round, slot))
                .collect();
            if batch.iter().all(|q| !avoid.contains(&q.question)) {
                return Ok(batch);
            }
            round += 1;
        }
    }
}

#[async_trait]
impl ExplanationGenerator for OfflineCollaborators {
    fn name(&self) -> &str {
        "offline"
    }

    async fn explain(
        &self,
        question: &str,
        _primary_context: &str,
        simple_context: &str,
    ) -> Result<String, CollaboratorError> {
        Ok(format!(
            "**The Core Idea**: {question}\n**The Everyday Analogy**: {simple_context}\n\
             **Quick Recap**: re-read the study summary, then try again."
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn objectives() -> Vec<String> {
        vec!["Ownership".into(), "Borrowing".into()]
    }

    #[tokio::test]
    async fn web_context_is_judged_relevant() {
        let offline = OfflineCollaborators::new();
        assert_eq!(offline.search_notes("Rust").await.unwrap(), "");

        let ctx = offline.search_web("Rust", &objectives()).await.unwrap();
        let verdict = offline.score("Rust", &objectives(), &ctx).await.unwrap();
        assert!(verdict.is_relevant);
        assert_eq!(verdict.score.value(), 100.0);
    }

    #[tokio::test]
    async fn empty_or_unrelated_context_is_irrelevant() {
        let offline = OfflineCollaborators::new();
        assert!(!offline.score("Rust", &objectives(), "   ").await.unwrap().is_relevant);

        let verdict = offline
            .score("Rust", &objectives(), "Gardening tips")
            .await
            .unwrap();
        assert!(!verdict.is_relevant);
        assert_eq!(verdict.score.value(), 0.0);
    }

    #[tokio::test]
    async fn generated_batches_are_valid_and_fresh() {
        let offline = OfflineCollaborators::new();
        let ctx = offline.search_web("Rust", &objectives()).await.unwrap();

        let first = offline.generate(&ctx, "Rust", &BTreeSet::new()).await.unwrap();
        assert_eq!(first.len(), OFFLINE_BATCH_SIZE);
        for q in &first {
            assert!(q.validate().is_ok());
        }

        let seen: BTreeSet<String> = first.iter().map(|q| q.question.clone()).collect();
        let second = offline.generate(&ctx, "Rust", &seen).await.unwrap();
        assert!(second.iter().all(|q| !seen.contains(&q.question)));
    }

    #[tokio::test]
    async fn summary_and_explanation_are_deterministic() {
        let offline = OfflineCollaborators::new();
        let summary = offline.summarize("- a\n- b\n", "Topic").await.unwrap();
        assert_eq!(summary, "# Topic\n- a\n- b\n");

        let simple = offline.search_simple_explanation("Q?").await.unwrap();
        let explanation = offline.explain("Q?", "ctx", &simple).await.unwrap();
        assert!(explanation.contains("The Core Idea"));
        assert!(explanation.contains("labelled boxes"));
    }
}
