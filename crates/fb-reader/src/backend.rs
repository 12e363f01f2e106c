//! The story backend seam.
//!
//! The backend generates narrative. The reader only depends on this trait;
//! `fb-api` provides the HTTP implementation and tests provide fakes.

use async_trait::async_trait;
use fb_core::{ComprehensionQuestion, Segment, SessionId, StoryMetadata};
use serde::{Deserialize, Serialize};

use crate::error::ExtensionError;

/// What the reader asked the story to do next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoryAction {
    /// Continue with the chosen branch.
    Choose {
        /// Description of the chosen branch.
        description: String,
    },
    /// Wrap the story up now.
    EndStory,
}

/// Input of an extension call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRequest {
    /// Session being extended.
    pub session_id: SessionId,
    /// The reader's action.
    pub action: StoryAction,
    /// Reader and story context.
    pub metadata: StoryMetadata,
}

/// A freshly started story.
#[derive(Debug, Clone, PartialEq)]
pub struct Opening {
    /// Backend-assigned session id.
    pub session_id: SessionId,
    /// The first segment.
    pub segment: Segment,
}

/// Output of an extension call.
#[derive(Debug, Clone, PartialEq)]
pub struct Extension {
    /// The new segment.
    pub segment: Segment,
    /// Questions about the segment the reader is leaving.
    pub prior_questions: Vec<ComprehensionQuestion>,
    /// Whether the backend concluded the story.
    pub is_conclusion: bool,
}

/// A generator of story segments.
#[async_trait]
pub trait StoryBackend {
    /// Start a new story and return its opening segment.
    async fn start(&self, metadata: &StoryMetadata) -> Result<Opening, ExtensionError>;

    /// Produce the next segment for a reader action.
    async fn extend(&self, request: &ExtensionRequest) -> Result<Extension, ExtensionError>;
}
