//! Validation errors for the story data model.

use crate::session::SessionId;

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Validation failures for the story data model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Segment sequence numbers are 1-based.
    #[error("segment sequence must be a positive integer, got {0}")]
    InvalidSequence(u32),

    /// A comprehension question offers no options to pick from.
    #[error("question {question} has no answer options")]
    NoOptions {
        /// Index of the offending question within its segment.
        question: usize,
    },

    /// The correct answer index points outside the option list.
    #[error("question {question}: correct answer {correct} is out of bounds for {options} options")]
    CorrectAnswerOutOfBounds {
        /// Index of the offending question within its segment.
        question: usize,
        /// The declared correct option index.
        correct: usize,
        /// Number of options the question offers.
        options: usize,
    },

    /// A session was restored without any segments.
    #[error("session {0} has no segments")]
    EmptySession(SessionId),

    /// A comprehension record names a segment the session does not have.
    #[error("comprehension record for segment {index} but the session has {segments} segments")]
    GateOutOfRange {
        /// Segment index of the record.
        index: usize,
        /// Number of segments in the session.
        segments: usize,
    },
}
