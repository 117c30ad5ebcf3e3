//! [`ContextSource`] over the notes directory and web search.

use async_trait::async_trait;
use autolearn_core::error::CollaboratorError;
use autolearn_core::ports::ContextSource;

use crate::notes::NotesDirectory;
use crate::web_search::DuckDuckGoSearch;

pub struct SearchContextSource {
    notes: NotesDirectory,
    web: DuckDuckGoSearch,
}

impl SearchContextSource {
    pub fn new(notes: NotesDirectory, web: DuckDuckGoSearch) -> Self {
        Self { notes, web }
    }
}

/// Query used for the web fallback: the topic followed by every objective.
pub fn web_query(topic: &str, objectives: &[String]) -> String {
    let mut query = topic.trim().to_string();
    for objective in objectives {
        query.push(' ');
        query.push_str(objective.trim());
    }
    query
}

/// Query used to find analogy-style material for a missed concept.
pub fn simple_explanation_query(concept: &str) -> String {
    format!("{} analogy simple explanation for students ELI5", concept.trim())
}

#[async_trait]
impl ContextSource for SearchContextSource {
    fn name(&self) -> &str {
        "search"
    }

    async fn search_notes(&self, topic: &str) -> Result<String, CollaboratorError> {
        self.notes.find(topic).await
    }

    async fn search_web(
        &self,
        topic: &str,
        objectives: &[String],
    ) -> Result<String, CollaboratorError> {
        self.web.search(&web_query(topic, objectives)).await
    }

    async fn search_simple_explanation(&self, concept: &str) -> Result<String, CollaboratorError> {
        self.web.search(&simple_explanation_query(concept)).await
    }
}
