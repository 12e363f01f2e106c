//! Sessions, their identifiers, reader metadata, and recorded gate outcomes.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::segment::Segment;

/// Backend-assigned identifier of a story session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a backend identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Reader and story context forwarded with every backend call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryMetadata {
    /// The main character the reader picked.
    #[serde(default)]
    pub character: String,
    /// Where the story takes place.
    #[serde(default)]
    pub setting: String,
    /// A special object woven into the story.
    #[serde(default)]
    pub object: String,
    /// Language the reader reads in (e.g. "en").
    #[serde(default)]
    pub language: String,
    /// Reader age in years, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
}

impl StoryMetadata {
    /// Create metadata for a character, setting, and object.
    pub fn new(
        character: impl Into<String>,
        setting: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            character: character.into(),
            setting: setting.into(),
            object: object.into(),
            ..Self::default()
        }
    }

    /// Set the reader language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the reader age.
    pub fn with_age(mut self, age: u8) -> Self {
        self.age = Some(age);
        self
    }
}

/// Recorded outcome of one segment's comprehension check.
///
/// Only submissions are recorded; selected but unsubmitted answers are not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateRecord {
    /// Submissions made so far.
    pub attempts: u32,
    /// Whether the latest attempt stands as submitted.
    #[serde(default)]
    pub passed: bool,
    /// Correct answers in the latest submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_correct: Option<usize>,
}

/// The ordered history of segments for one story.
///
/// Segments only grow by append. Once `completed` is set the session is
/// terminal and the store refuses further appends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Backend identifier.
    pub session_id: SessionId,
    /// Segments in narrative order.
    pub segments: Vec<Segment>,
    /// Context forwarded to the backend.
    #[serde(default)]
    pub metadata: StoryMetadata,
    /// Whether the story has ended.
    #[serde(default)]
    pub completed: bool,
    /// Comprehension check outcomes, keyed by segment index.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub gates: BTreeMap<usize, GateRecord>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When a segment was last appended or patched.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Start a session from its opening segment.
    ///
    /// An opening segment without choices is already a complete story.
    pub fn new(session_id: SessionId, first: Segment, metadata: StoryMetadata) -> Self {
        let now = Utc::now();
        let completed = first.is_ending();
        Self {
            session_id,
            segments: vec![first],
            metadata,
            completed,
            gates: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Number of segments generated so far.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the session holds no segments (only possible for corrupt data).
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Index of the newest segment, or `None` for corrupt data.
    pub fn last_index(&self) -> Option<usize> {
        self.segments.len().checked_sub(1)
    }

    /// The newest segment.
    pub fn last_segment(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Segment at `index`.
    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// Check the invariants a restored session must satisfy.
    pub fn validate(&self) -> CoreResult<()> {
        if self.segments.is_empty() {
            return Err(CoreError::EmptySession(self.session_id.clone()));
        }
        self.segments.iter().try_for_each(Segment::validate)?;
        if let Some((&index, _)) = self.gates.range(self.segments.len()..).next() {
            return Err(CoreError::GateOutOfRange {
                index,
                segments: self.segments.len(),
            });
        }
        Ok(())
    }
}
