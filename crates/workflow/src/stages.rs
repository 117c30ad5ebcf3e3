//! Stage functions.
//!
//! Each stage reads the current [`SessionState`] and returns its partial
//! update as a [`StageOutput`]. Stages never persist anything and never
//! mutate the state they are given; the engine merges and checkpoints.

use autolearn_core::error::{CollaboratorError, StageError};
use autolearn_core::ports::{Collaborators, Relevance};
use autolearn_core::session::{
    Attempt, Explanation, GatherOutput, OPTIONS_PER_QUESTION, Percent, ProcessOutput, Question,
    QuestionsOutput, RemedialOutput, SessionState, StageOutput, StartOutput, SummarizeOutput,
    ValidateOutput, VerifyOutput,
};
use chrono::Utc;
use futures::future::try_join_all;
use tracing::debug;

use crate::chunk::TextChunker;
use crate::policy::WorkflowPolicy;

pub fn start(_state: &SessionState) -> StageOutput {
    StageOutput::Start(StartOutput {
        iterations: 0,
        message: "Starting context gathering...".into(),
    })
}

/// Notes first; the web only when the notes come back empty.
pub async fn gather(state: &SessionState, ports: &Collaborators) -> Result<StageOutput, StageError> {
    let checkpoint = &state.checkpoint;

    let notes = ports.context.search_notes(&checkpoint.topic).await?;
    if !notes.trim().is_empty() {
        return Ok(StageOutput::Gather(GatherOutput {
            context: notes,
            message: "Context gathered from notes.".into(),
        }));
    }

    debug!(topic = %checkpoint.topic, "No notes found, falling back to web search");
    let web = ports
        .context
        .search_web(&checkpoint.topic, &checkpoint.objectives)
        .await?;
    Ok(StageOutput::Gather(GatherOutput {
        context: web,
        message: "Context gathered from web search.".into(),
    }))
}

/// Judge the current context. An empty context is never relevant and never
/// reaches the judge.
pub async fn validate(
    state: &SessionState,
    ports: &Collaborators,
) -> Result<StageOutput, StageError> {
    let checkpoint = &state.checkpoint;

    let verdict = if checkpoint.has_context() {
        ports
            .relevance
            .score(&checkpoint.topic, &checkpoint.objectives, checkpoint.context_str())
            .await?
    } else {
        Relevance::irrelevant()
    };

    Ok(StageOutput::Validate(ValidateOutput {
        is_relevant: verdict.is_relevant,
        relevance_score: verdict.score,
        iterations: state.iterations + 1,
        message: format!(
            "Relevance check: {} (Score: {})",
            verdict.is_relevant, verdict.score
        ),
    }))
}

pub fn process(state: &SessionState, policy: &WorkflowPolicy) -> StageOutput {
    let chunker = TextChunker::new(policy.chunk_size, policy.chunk_overlap);
    let chunk_count = chunker.split(state.checkpoint.context_str()).len();
    StageOutput::Process(ProcessOutput {
        chunk_count,
        message: format!("Processed into {chunk_count} chunks."),
    })
}

pub async fn summarize(
    state: &SessionState,
    ports: &Collaborators,
) -> Result<StageOutput, StageError> {
    let checkpoint = &state.checkpoint;
    let summary = ports
        .summarizer
        .summarize(checkpoint.context_str(), &checkpoint.topic)
        .await?;
    Ok(StageOutput::Summarize(SummarizeOutput {
        summary,
        message: "Study material generated.".into(),
    }))
}

pub async fn questions(
    state: &SessionState,
    ports: &Collaborators,
    policy: &WorkflowPolicy,
) -> Result<StageOutput, StageError> {
    let checkpoint = &state.checkpoint;
    let mcqs = ports
        .questions
        .generate(
            checkpoint.context_str(),
            &checkpoint.topic,
            &state.seen_questions,
        )
        .await?;

    validate_batch(&mcqs, policy)?;

    let message = format!("Generated {} fresh questions.", mcqs.len());
    Ok(StageOutput::Questions(QuestionsOutput { mcqs, message }))
}

/// Reject a batch that breaks the generator contract. Nothing is repaired.
pub fn validate_batch(mcqs: &[Question], policy: &WorkflowPolicy) -> Result<(), StageError> {
    if mcqs.len() < policy.min_questions || mcqs.len() > policy.max_questions {
        return Err(StageError::MalformedGeneratorOutput(format!(
            "expected {}-{} questions, got {}",
            policy.min_questions,
            policy.max_questions,
            mcqs.len()
        )));
    }
    for (i, q) in mcqs.iter().enumerate() {
        q.validate()
            .map_err(|reason| StageError::MalformedGeneratorOutput(format!("question {i}: {reason}")))?;
    }
    Ok(())
}

/// Score `answers` against the current batch. The caller has already
/// checked that there is one answer per question.
pub fn verify(state: &SessionState, answers: &[usize], policy: &WorkflowPolicy) -> StageOutput {
    let missed_indices: Vec<usize> = state
        .mcqs
        .iter()
        .zip(answers)
        .enumerate()
        .filter(|(_, (q, answer))| **answer != q.correct_index)
        .map(|(i, _)| i)
        .collect();

    let total = state.mcqs.len();
    let score = Percent::from_ratio(total - missed_indices.len(), total);
    let passed = total > 0 && score.value() >= policy.mastery_threshold;

    StageOutput::Verify(VerifyOutput {
        attempt: Attempt {
            batch: state.mcqs.clone(),
            answers: answers.to_vec(),
            score,
            missed_indices,
            passed,
            submitted_at: Utc::now(),
        },
        message: format!("Quiz completed with score: {score}"),
    })
}

/// Produce a simplified explanation for one question of a batch.
pub async fn explain_question(
    ports: &Collaborators,
    index: usize,
    question: &Question,
    primary_context: &str,
) -> Result<Explanation, CollaboratorError> {
    let simple = ports
        .context
        .search_simple_explanation(&question.question)
        .await?;
    let explanation = ports
        .explainer
        .explain(&question.question, primary_context, &simple)
        .await?;
    Ok(Explanation {
        index,
        question: question.question.clone(),
        correct_answer: question.correct_answer().unwrap_or_default().to_string(),
        explanation,
    })
}

/// Explain every missed question. Results keep the order of `missed_indices`.
pub async fn remedial(
    state: &SessionState,
    ports: &Collaborators,
    policy: &WorkflowPolicy,
) -> Result<StageOutput, StageError> {
    if state.missed_indices.is_empty() {
        return Ok(StageOutput::Remedial(RemedialOutput {
            explanations: Vec::new(),
            messages: vec!["No missed concepts to reinforce.".into()],
        }));
    }

    let mut targets = Vec::with_capacity(state.missed_indices.len());
    for &index in &state.missed_indices {
        let question = state.mcqs.get(index).ok_or_else(|| {
            StageError::MissingInput(format!(
                "missed index {index} outside batch of {}",
                state.mcqs.len()
            ))
        })?;
        targets.push((index, question));
    }

    let context = state.checkpoint.context_str();
    let explanations = if policy.concurrent_remediation {
        try_join_all(
            targets
                .iter()
                .map(|(index, question)| explain_question(ports, *index, question, context)),
        )
        .await?
    } else {
        let mut out = Vec::with_capacity(targets.len());
        for (index, question) in &targets {
            out.push(explain_question(ports, *index, question, context).await?);
        }
        out
    };

    let messages = explanations
        .iter()
        .map(|e| format!("Reinforced concept: '{}'", e.question))
        .collect();

    Ok(StageOutput::Remedial(RemedialOutput {
        explanations,
        messages,
    }))
}

/// Whether `answer` names one of the options.
pub fn is_valid_answer(answer: usize) -> bool {
    answer < OPTIONS_PER_QUESTION
}
