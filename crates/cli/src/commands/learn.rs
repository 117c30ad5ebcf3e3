//! `autolearn learn`: Start a learning session.

use autolearn_workflow::NewSession;

use super::{build_service, interactive, load_config, with_resume_hint};

pub async fn run(
    topic: String,
    objectives: Vec<String>,
    criteria: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let service = build_service(&config).await?;

    eprintln!("  Gathering material on '{topic}'...");
    let view = service
        .create_session(NewSession {
            topic,
            objectives,
            success_criteria: criteria,
        })
        .await
        .map_err(|e| with_resume_hint(&e, e.session_id()))?;

    interactive::run(&service, view).await
}
