//! JSON shapes exchanged with the story backend.
//!
//! Responses are decoded loosely and converted once into the validated
//! `fb-core` model. Anything that does not form a valid segment becomes
//! [`ExtensionError::InvalidResponse`].

use fb_core::{Choice, ComprehensionQuestion, Segment, StoryMetadata};
use fb_reader::{Extension, ExtensionError, ExtensionRequest, Opening, StoryAction};
use serde::{Deserialize, Serialize};

/// Body of `POST /stories`.
#[derive(Debug, Clone, Serialize)]
pub struct StartRequest<'a> {
    /// Reader and story context.
    pub metadata: &'a StoryMetadata,
}

/// Body of `POST /stories/{id}/continue`.
#[derive(Debug, Clone, Serialize)]
pub struct ContinueRequest<'a> {
    /// The reader's action.
    pub action: &'a StoryAction,
    /// Reader and story context.
    pub metadata: &'a StoryMetadata,
}

impl<'a> From<&'a ExtensionRequest> for ContinueRequest<'a> {
    fn from(request: &'a ExtensionRequest) -> Self {
        Self {
            action: &request.action,
            metadata: &request.metadata,
        }
    }
}

/// A choice as the backend sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct ChoicePayload {
    /// Button label.
    #[serde(default)]
    pub label: Option<String>,
    /// Action text sent back when chosen.
    pub description: String,
}

/// A question as the backend sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionPayload {
    /// The question text.
    pub question: String,
    /// Answer options.
    #[serde(default)]
    pub options: Vec<String>,
    /// Index of the correct option; may be out of range on the wire.
    pub correct_answer: i64,
}

/// A segment as the backend sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentPayload {
    /// Narrative position; may be zero or negative on the wire.
    pub sequence: i64,
    /// The narrative prose.
    pub story_text: String,
    /// The choice that led here.
    #[serde(default)]
    pub choice_made: Option<String>,
    /// Choices offered next.
    #[serde(default)]
    pub next_choices: Option<Vec<ChoicePayload>>,
    /// Questions about this segment.
    #[serde(default)]
    pub comprehension_questions: Option<Vec<QuestionPayload>>,
    /// Analytics payload.
    #[serde(default)]
    pub metrics: Option<serde_json::Value>,
}

/// Response of `POST /stories`.
#[derive(Debug, Clone, Deserialize)]
pub struct StartResponse {
    /// Backend-assigned session id.
    pub session_id: String,
    /// The opening segment.
    pub segment: SegmentPayload,
}

/// Response of `POST /stories/{id}/continue`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContinueResponse {
    /// The new segment.
    pub segment: SegmentPayload,
    /// Questions about the segment the reader is leaving.
    #[serde(default)]
    pub comprehension_questions: Vec<QuestionPayload>,
    /// Whether the story has concluded.
    #[serde(default)]
    pub is_conclusion: bool,
}

fn invalid(message: impl Into<String>) -> ExtensionError {
    ExtensionError::InvalidResponse(message.into())
}

impl QuestionPayload {
    fn into_question(self) -> Result<ComprehensionQuestion, ExtensionError> {
        let correct = usize::try_from(self.correct_answer)
            .map_err(|_| invalid(format!("negative correct_answer {}", self.correct_answer)))?;
        Ok(ComprehensionQuestion::new(self.question, self.options, correct))
    }
}

fn into_questions(
    payload: Vec<QuestionPayload>,
) -> Result<Vec<ComprehensionQuestion>, ExtensionError> {
    let questions = payload
        .into_iter()
        .map(QuestionPayload::into_question)
        .collect::<Result<Vec<_>, _>>()?;
    fb_core::validate_questions(&questions).map_err(|e| invalid(e.to_string()))?;
    Ok(questions)
}

impl TryFrom<SegmentPayload> for Segment {
    type Error = ExtensionError;

    fn try_from(payload: SegmentPayload) -> Result<Self, Self::Error> {
        let sequence = u32::try_from(payload.sequence)
            .ok()
            .filter(|s| *s > 0)
            .ok_or_else(|| invalid(format!("sequence {} is not positive", payload.sequence)))?;
        if payload.story_text.trim().is_empty() {
            return Err(invalid("empty story text"));
        }

        let choices = payload
            .next_choices
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, c)| {
                let label = c.label.unwrap_or_else(|| (i + 1).to_string());
                Choice::new(label, c.description)
            });
        let questions = into_questions(payload.comprehension_questions.unwrap_or_default())?;

        let mut segment = Segment::new(sequence, payload.story_text)
            .with_choices(choices)
            .with_questions(questions)
            .with_metrics(payload.metrics.unwrap_or(serde_json::Value::Null));
        segment.choice_made = payload.choice_made;
        segment.validate().map_err(|e| invalid(e.to_string()))?;
        Ok(segment)
    }
}

impl TryFrom<StartResponse> for Opening {
    type Error = ExtensionError;

    fn try_from(response: StartResponse) -> Result<Self, Self::Error> {
        if response.session_id.trim().is_empty() {
            return Err(invalid("empty session id"));
        }
        Ok(Opening {
            session_id: response.session_id.as_str().into(),
            segment: response.segment.try_into()?,
        })
    }
}

impl TryFrom<ContinueResponse> for Extension {
    type Error = ExtensionError;

    fn try_from(response: ContinueResponse) -> Result<Self, Self::Error> {
        Ok(Extension {
            segment: response.segment.try_into()?,
            prior_questions: into_questions(response.comprehension_questions)?,
            is_conclusion: response.is_conclusion,
        })
    }
}
