//! `autolearn history`: List past sessions.

use super::{build_service, load_config};

pub async fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let service = build_service(&config).await?;
    let sessions = service.history().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("  No sessions yet. Start one with: autolearn learn --topic <topic>");
        return Ok(());
    }

    println!("📚 Learning History ({} sessions)", sessions.len());
    println!();
    for s in &sessions {
        let score = s
            .score
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "  {}  {:<20} {:>7}  {:<22} {}",
            s.created_at.format("%Y-%m-%d %H:%M"),
            s.status.to_string(),
            score,
            s.id.to_string(),
            s.topic
        );
    }

    Ok(())
}
