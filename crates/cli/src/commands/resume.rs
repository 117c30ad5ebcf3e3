//! `autolearn resume`: Continue a session from its last checkpoint.

use autolearn_core::session::SessionId;

use super::{build_service, interactive, load_config};

pub async fn run(id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let service = build_service(&config).await?;

    let view = service
        .resume(&SessionId::from(id))
        .await
        .map_err(|e| format!("Failed to resume session {id}: {e}"))?;

    interactive::run(&service, view).await
}
