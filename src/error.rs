//! Error taxonomy for curriculum progression.
//!
//! Plumbing failures (filesystem, subprocess, HTTP) travel as `anyhow::Error`
//! with context; these variants are the ones callers are expected to branch on.
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurriculumError {
    #[error("unknown grade '{0}' (expected kindergarten or grade_1 through grade_5)")]
    UnknownGrade(String),

    #[error("corrupt progress state for {grade}: {reason}")]
    CorruptProgressState { grade: String, reason: String },

    #[error("topic index {index} out of range for a sequence of {len} topics")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("content generation failed: {0}")]
    GenerationFailure(String),

    #[error("invalid curriculum catalog: {0}")]
    InvalidCatalog(String),

    #[error("unknown topic '{0}'")]
    UnknownTopic(String),

    #[error("topic '{topic}' is not available for {grade}")]
    TopicNotInGrade { topic: String, grade: String },

    #[error("run dated {date} is earlier than the last recorded run on {last}")]
    OutOfOrderRun { date: NaiveDate, last: NaiveDate },
}

impl CurriculumError {
    /// Process exit code used by the CLI when this error ends an invocation.
    pub fn exit_code(&self) -> u8 {
        match self {
            CurriculumError::UnknownGrade(_)
            | CurriculumError::UnknownTopic(_)
            | CurriculumError::TopicNotInGrade { .. }
            | CurriculumError::OutOfOrderRun { .. } => 2,
            CurriculumError::CorruptProgressState { .. } => 3,
            CurriculumError::GenerationFailure(_) => 4,
            CurriculumError::IndexOutOfRange { .. } | CurriculumError::InvalidCatalog(_) => 70,
        }
    }

    pub(crate) fn corrupt(grade: impl ToString, reason: impl Into<String>) -> Self {
        CurriculumError::CorruptProgressState {
            grade: grade.to_string(),
            reason: reason.into(),
        }
    }
}

/// Find the curriculum error carried by an `anyhow` chain, if any.
pub fn curriculum_error(err: &anyhow::Error) -> Option<&CurriculumError> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<CurriculumError>())
}
