//! `autolearn delete`: Forget a session and its checkpoint.

use autolearn_core::session::SessionId;

use super::{build_service, load_config};

pub async fn run(id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let service = build_service(&config).await?;

    let existed = service
        .delete_session(&SessionId::from(id))
        .await
        .map_err(|e| format!("Failed to delete session {id}: {e}"))?;

    if existed {
        println!("  Deleted session {id}.");
        Ok(())
    } else {
        Err(format!("No session with id {id}").into())
    }
}
