//! Collaborator adapters for AutoLearn.
//!
//! Every adapter implements one or more of the port traits in
//! `autolearn_core::ports`. [`build_collaborators`] assembles the registry the
//! workflow engine is constructed with.

pub mod context;
pub mod llm;
pub mod notes;
pub mod offline;
pub mod openai_compat;
pub mod web_search;

pub use context::SearchContextSource;
pub use llm::LlmCollaborators;
pub use notes::NotesDirectory;
pub use offline::OfflineCollaborators;
pub use openai_compat::{Chat, ChatClient};
pub use web_search::DuckDuckGoSearch;

use autolearn_config::AppConfig;
use autolearn_core::error::CollaboratorError;
use autolearn_core::ports::Collaborators;
use std::sync::Arc;
use tracing::info;

/// Build the collaborator registry described by `config.collaborators.mode`.
pub fn build_collaborators(config: &AppConfig) -> Result<Collaborators, CollaboratorError> {
    match config.collaborators.mode.as_str() {
        "offline" => {
            info!("Using offline collaborators");
            Ok(offline_collaborators())
        }
        "llm" => {
            let chat = Arc::new(ChatClient::new(&config.llm)?);
            info!(model = %chat.model(), "Using LLM collaborators");
            let llm = Arc::new(LlmCollaborators::new(chat));

            let notes = NotesDirectory::new(config.search.notes_dir.clone(), config.search.max_chars);
            let web = DuckDuckGoSearch::new(&config.search, config.llm.timeout_secs)?;
            let context = Arc::new(SearchContextSource::new(notes, web));

            Ok(Collaborators::new(
                context,
                llm.clone(),
                llm.clone(),
                llm.clone(),
                llm,
            ))
        }
        other => Err(CollaboratorError::Unavailable(format!(
            "Unknown collaborators mode: {other}"
        ))),
    }
}

/// A registry where every port is the offline implementation.
pub fn offline_collaborators() -> Collaborators {
    let offline = Arc::new(OfflineCollaborators::new());
    Collaborators::new(
        offline.clone(),
        offline.clone(),
        offline.clone(),
        offline.clone(),
        offline,
    )
}
