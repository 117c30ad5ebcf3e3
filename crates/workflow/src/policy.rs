//! Tunable limits the engine and stages run under.

use autolearn_config::WorkflowConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowPolicy {
    /// Ceiling on `validate` passes in the context-retry cycle
    pub max_context_attempts: u32,
    /// Minimum assessment score (inclusive) that counts as mastery
    pub mastery_threshold: f64,
    pub min_questions: usize,
    pub max_questions: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Run remediation sub-calls for different missed questions concurrently
    pub concurrent_remediation: bool,
}

impl WorkflowPolicy {
    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self {
            max_context_attempts: config.max_context_attempts,
            mastery_threshold: config.mastery_threshold,
            min_questions: config.min_questions,
            max_questions: config.max_questions,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            concurrent_remediation: config.concurrent_remediation,
        }
    }
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self::from_config(&WorkflowConfig::default())
    }
}
