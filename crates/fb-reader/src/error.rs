//! Error types for the reader state machine.

use std::path::PathBuf;

use fb_core::{CoreError, SessionId};
use thiserror::Error;

/// Result type for session store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for comprehension gate operations.
pub type GateResult<T> = Result<T, GateError>;

/// Result type for progression controller operations.
pub type ControllerResult<T> = Result<T, ControllerError>;

/// Errors raised by the session store. None of them mutate state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No session with this id exists.
    #[error("session not found: {0}")]
    NotFound(SessionId),

    /// A session with this id already exists.
    #[error("session already exists: {0}")]
    Duplicate(SessionId),

    /// The session has ended and accepts no further segments.
    #[error("session {0} is already completed")]
    Completed(SessionId),

    /// The segment index does not exist in the session.
    #[error("segment index {index} out of range for session {session} ({len} segments)")]
    IndexOutOfRange {
        /// Session addressed.
        session: SessionId,
        /// Requested index.
        index: usize,
        /// Number of segments in the session.
        len: usize,
    },

    /// The session failed validation on restore and is quarantined.
    #[error("session {0} is unusable: {1}")]
    Unusable(SessionId, CoreError),

    /// Segment or question data failed validation.
    #[error("invalid story data: {0}")]
    Invalid(#[from] CoreError),
}

/// Errors raised by a comprehension gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// The question index does not exist.
    #[error("question {index} out of range ({total} questions)")]
    QuestionOutOfRange {
        /// Requested question.
        index: usize,
        /// Number of questions.
        total: usize,
    },

    /// The option index does not exist for this question.
    #[error("option {option} out of range for question {question} ({total} options)")]
    OptionOutOfRange {
        /// Question addressed.
        question: usize,
        /// Requested option.
        option: usize,
        /// Number of options.
        total: usize,
    },

    /// Answers are only accepted while the gate is open.
    #[error("comprehension check is not open for answers")]
    NotOpen,

    /// The current attempt was already submitted.
    #[error("answers already submitted")]
    AlreadySubmitted,

    /// No retry is available (perfect score or attempts exhausted).
    #[error("no retry available")]
    RetryUnavailable,

    /// The segment carries no comprehension check.
    #[error("segment {0} has no comprehension check")]
    NoQuestions(usize),
}

/// Transient failures of the external story backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtensionError {
    /// The request never reached the backend or the connection dropped.
    #[error("network error: {0}")]
    Network(String),

    /// The backend did not answer in time.
    #[error("story backend timed out")]
    Timeout,

    /// The backend answered with an error status.
    #[error("story backend returned status {status}: {message}")]
    Server {
        /// HTTP-style status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The backend answered with data that does not form a valid segment.
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
}

/// Errors raised by the progression controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// Session store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Comprehension gate failure.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// The choice is not offered by the segment.
    #[error("choice not offered by segment {index}: {choice}")]
    InvalidChoice {
        /// Segment index addressed.
        index: usize,
        /// Description of the rejected choice.
        choice: String,
    },

    /// Only the newest segment can be continued.
    #[error("segment {index} is not the newest segment (last is {last})")]
    StaleSegment {
        /// Requested segment index.
        index: usize,
        /// Index of the newest segment.
        last: usize,
    },

    /// The backend call failed; nothing was applied and the intent can be retried.
    #[error("story extension failed: {0}")]
    Extension(#[from] ExtensionError),
}

/// Errors reading or writing a snapshot file.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Filesystem failure.
    #[error("cannot access {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file does not hold a valid snapshot.
    #[error("malformed snapshot {path}: {source}")]
    Json {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}
