pub mod config_cmd;
pub mod delete;
pub mod history;
pub mod learn;
pub mod resume;
pub mod show;

mod interactive;

use autolearn_config::AppConfig;
use autolearn_core::session::SessionId;
use autolearn_providers::build_collaborators;
use autolearn_workflow::{LearningService, WorkflowPolicy};
use std::fmt::Display;
use tracing::debug;

/// Wire a service from the loaded configuration.
pub(crate) async fn build_service(
    config: &AppConfig,
) -> Result<LearningService, Box<dyn std::error::Error>> {
    let path = config.store.resolved_path();
    debug!(backend = %config.store.backend, path = %path.display(), mode = %config.collaborators.mode, "Building learning service");
    let store = autolearn_store::open(&config.store.backend, &path)
        .await
        .map_err(|e| format!("Failed to open session store: {e}"))?;
    let ports = build_collaborators(config).map_err(|e| {
        format!("Failed to set up collaborators: {e} (set collaborators.mode = \"offline\" to run without an API key)")
    })?;
    Ok(LearningService::from_parts(
        store,
        ports,
        WorkflowPolicy::from_config(&config.workflow),
    ))
}

pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Error text that tells the user how to pick the session back up.
pub(crate) fn with_resume_hint(message: impl Display, id: Option<&SessionId>) -> String {
    match id {
        Some(id) => format!("{message}\n  Retry with: autolearn resume {id}"),
        None => message.to_string(),
    }
}
