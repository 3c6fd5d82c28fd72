//! Error taxonomy for the agent core
//!
//! Generator failures and output-validation failures are recoverable for
//! single-item generation (fallback content is substituted); roadmap
//! creation and store failures propagate. Not-found is kept distinct so
//! the action layer can report it as such rather than as a generic failure.

use thiserror::Error;

/// Failure at the content-generator boundary
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("generator request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generator request timed out after {0}s")]
    Timeout(u64),

    #[error("generator returned malformed {kind} output: {detail}")]
    Malformed { kind: &'static str, detail: String },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Structured-output validation failure (untrusted generator output)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("lesson is missing a required field: {0}")]
    LessonField(&'static str),

    #[error("quiz has no questions")]
    QuizEmpty,

    #[error("quiz question {index} has {count} options, expected 4")]
    QuizOptionCount { index: usize, count: usize },

    #[error("quiz question {index} has correct answer {answer}, expected 0..=3")]
    QuizAnswerRange { index: usize, answer: i64 },

    #[error("flashcard set is empty or has a blank card")]
    FlashcardsInvalid,

    #[error("roadmap outline has {got} days, expected {expected}")]
    OutlineDayCount { expected: u32, got: usize },

    #[error("roadmap outline day {0} is missing its topic or description")]
    OutlineDayField(u32),
}

/// Errors surfaced by the roadmap progression service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("day {day} of roadmap {roadmap} is {status}, cannot complete")]
    DayNotCompletable {
        roadmap: String,
        day: u32,
        status: String,
    },

    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}
