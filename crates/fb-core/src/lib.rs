//! Core types for Fabula: story segments, sessions, and comprehension questions.
//!
//! This crate is the data model shared by the reader state machine, the
//! backend client, and the CLI. It holds no behavior beyond structural
//! access and validation.

pub mod error;
pub mod segment;
pub mod session;

pub use error::{CoreError, CoreResult};
pub use segment::{Choice, ComprehensionQuestion, Segment, validate_questions};
pub use session::{GateRecord, Session, SessionId, StoryMetadata};
