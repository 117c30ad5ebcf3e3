//! `autolearn show`: Show one session in detail.

use autolearn_core::session::SessionId;

use super::{build_service, load_config};

pub async fn run(id: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let service = build_service(&config).await?;
    let view = service.session(&SessionId::from(id)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("  Session:    {}", view.id);
    println!("  Topic:      {}", view.topic);
    for objective in &view.objectives {
        println!("  Objective:  {objective}");
    }
    for criterion in &view.success_criteria {
        println!("  Criterion:  {criterion}");
    }
    println!("  Status:     {}", view.status);
    println!("  Position:   {} (step {})", view.cursor, view.step);
    println!("  Relevance:  {} after {} attempt(s)", view.relevance_score, view.iterations);
    if let Some(score) = view.score {
        println!("  Last score: {score} over {} assessment(s)", view.attempts);
    }

    if let Some(summary) = &view.summary {
        println!();
        println!("  Summary ({} chunks)", view.chunk_count);
        for line in summary.lines() {
            println!("    {line}");
        }
    }

    if !view.explanations.is_empty() {
        println!();
        println!("  Explanations");
        for e in &view.explanations {
            println!("    Q{}. {} (answer: {})", e.index + 1, e.question, e.correct_answer);
        }
    }

    println!();
    println!("  Log");
    for message in &view.messages {
        println!("    {message}");
    }

    Ok(())
}
