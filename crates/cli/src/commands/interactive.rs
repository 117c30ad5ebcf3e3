//! The question/answer loop shared by `learn` and `resume`.

use autolearn_core::session::SessionStatus;
use autolearn_workflow::{AssessmentReport, LearningService, QuestionView, SessionView};
use super::with_resume_hint;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};

/// Drive a session from `view` until it finishes or stdin closes.
pub async fn run(
    service: &LearningService,
    view: SessionView,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    print_overview(&view);
    let id = view.id.clone();
    let mut questions = view.questions;

    while !questions.is_empty() {
        let Some(answers) = read_answers(&mut lines, &mut stdout, &questions).await? else {
            println!();
            println!("  Session saved. Continue later with:");
            println!("    autolearn resume {id}");
            return Ok(());
        };

        let report = service
            .submit_answers(&id, &answers)
            .await
            .map_err(|e| with_resume_hint(format!("Failed to submit answers: {e}"), Some(&id)))?;
        print_report(&report);
        questions = report.next_questions;
    }

    let final_view = service.session(&id).await?;
    print_outcome(&final_view);
    Ok(())
}

/// Ask every question in turn. Returns `None` on end of input.
///
/// Answers are typed as `1`-`4`; anything else is asked again.
pub async fn read_answers<R, W>(
    lines: &mut Lines<R>,
    out: &mut W,
    questions: &[QuestionView],
) -> std::io::Result<Option<Vec<usize>>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut answers = Vec::with_capacity(questions.len());
    for q in questions {
        let mut prompt = format!("\n  Q{}. {}\n", q.index + 1, q.question);
        for (i, option) in q.options.iter().enumerate() {
            prompt.push_str(&format!("     {}) {option}\n", i + 1));
        }
        out.write_all(prompt.as_bytes()).await?;

        loop {
            out.write_all(b"  Your answer (1-4) > ").await?;
            out.flush().await?;
            let Some(line) = lines.next_line().await? else {
                return Ok(None);
            };
            match parse_answer(&line, q.options.len()) {
                Some(answer) => {
                    answers.push(answer);
                    break;
                }
                None => {
                    out.write_all(b"  Please type a number between 1 and 4.\n")
                        .await?;
                }
            }
        }
    }
    Ok(Some(answers))
}

/// `"1"` .. `"n"` to a zero-based option index.
pub fn parse_answer(input: &str, options: usize) -> Option<usize> {
    let n: usize = input.trim().parse().ok()?;
    (1..=options).contains(&n).then(|| n - 1)
}

fn print_overview(view: &SessionView) {
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║            AutoLearn: Study Session           ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Session:   {}", view.id);
    println!("  Topic:     {}", view.topic);
    println!("  Relevance: {}", view.relevance_score);
    if let Some(summary) = &view.summary {
        println!();
        println!("  Summary");
        println!("  -------");
        for line in summary.lines() {
            println!("  {line}");
        }
    }
}

fn print_report(report: &AssessmentReport) {
    println!();
    if report.passed {
        println!("  ✅ Score: {} (passed)", report.score);
        return;
    }

    println!("  ❌ Score: {} (needs review)", report.score);
    for c in &report.corrections {
        println!();
        println!("  Q{}. {}", c.index + 1, c.question);
        println!("     Your answer:    {}", c.your_answer);
        println!("     Correct answer: {}", c.correct_answer);
    }
    if !report.explanations.is_empty() {
        println!();
        println!("  Let's go over the missed concepts:");
        for e in &report.explanations {
            println!();
            println!("  📘 {}", e.question);
            for line in e.explanation.lines() {
                println!("     {line}");
            }
        }
    }
    if !report.next_questions.is_empty() {
        println!();
        println!("  Here is a fresh set of questions.");
    }
}

fn print_outcome(view: &SessionView) {
    println!();
    match view.status {
        SessionStatus::Mastered => {
            println!("  🎉 Topic mastered: {}", view.topic);
        }
        SessionStatus::InsufficientContext => {
            println!(
                "  ⚠️  Could not find relevant material for '{}' after {} attempts.",
                view.topic, view.iterations
            );
            println!("     Try adding notes or rephrasing the objectives.");
        }
        other => {
            println!("  Session {} is {other}.", view.id);
            println!("    autolearn resume {}", view.id);
        }
    }
    println!();
}
