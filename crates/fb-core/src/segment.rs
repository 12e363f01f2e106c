//! Segments, the choices they offer, and their comprehension questions.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A branch the reader can take from a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Short label shown on the choice button.
    pub label: String,
    /// The action sent to the backend when this choice is taken.
    pub description: String,
}

impl Choice {
    /// Create a choice from a label and a description.
    pub fn new(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
        }
    }
}

/// A multiple-choice question about a segment's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComprehensionQuestion {
    /// The question text.
    pub prompt: String,
    /// Answer options, in display order.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct_answer: usize,
}

impl ComprehensionQuestion {
    /// Create a question without validating it.
    pub fn new(
        prompt: impl Into<String>,
        options: impl IntoIterator<Item = impl Into<String>>,
        correct_answer: usize,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            options: options.into_iter().map(Into::into).collect(),
            correct_answer,
        }
    }

    /// Whether `option` is the correct answer.
    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_answer
    }

    /// Check the question as the `index`-th question of a segment.
    pub fn validate(&self, index: usize) -> CoreResult<()> {
        if self.options.is_empty() {
            return Err(CoreError::NoOptions { question: index });
        }
        if self.correct_answer >= self.options.len() {
            return Err(CoreError::CorrectAnswerOutOfBounds {
                question: index,
                correct: self.correct_answer,
                options: self.options.len(),
            });
        }
        Ok(())
    }
}

/// Validate a full question list, reporting the first bad question.
pub fn validate_questions(questions: &[ComprehensionQuestion]) -> CoreResult<()> {
    questions
        .iter()
        .enumerate()
        .try_for_each(|(i, q)| q.validate(i))
}

/// One unit of generated narrative plus its choices and optional questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// 1-based narrative position, as numbered by the backend.
    pub sequence: u32,
    /// The narrative prose.
    pub story_text: String,
    /// The choice that led here; `None` for the opening segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_made: Option<String>,
    /// Choices offered after this segment. Empty means the story ended.
    #[serde(default)]
    pub next_choices: Vec<Choice>,
    /// Questions gating progression past this segment.
    #[serde(default)]
    pub comprehension_questions: Vec<ComprehensionQuestion>,
    /// Analytics payload, carried through untouched.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metrics: serde_json::Value,
}

impl Segment {
    /// Create a segment with no choices, questions, or metrics.
    pub fn new(sequence: u32, story_text: impl Into<String>) -> Self {
        Self {
            sequence,
            story_text: story_text.into(),
            choice_made: None,
            next_choices: Vec::new(),
            comprehension_questions: Vec::new(),
            metrics: serde_json::Value::Null,
        }
    }

    /// Set the choice that produced this segment.
    pub fn with_choice_made(mut self, choice: impl Into<String>) -> Self {
        self.choice_made = Some(choice.into());
        self
    }

    /// Set the choices offered after this segment.
    pub fn with_choices(mut self, choices: impl IntoIterator<Item = Choice>) -> Self {
        self.next_choices = choices.into_iter().collect();
        self
    }

    /// Attach comprehension questions.
    pub fn with_questions(
        mut self,
        questions: impl IntoIterator<Item = ComprehensionQuestion>,
    ) -> Self {
        self.comprehension_questions = questions.into_iter().collect();
        self
    }

    /// Attach an analytics payload.
    pub fn with_metrics(mut self, metrics: serde_json::Value) -> Self {
        self.metrics = metrics;
        self
    }

    /// Whether this segment concludes the narrative on its own.
    pub fn is_ending(&self) -> bool {
        self.next_choices.is_empty()
    }

    /// Whether this segment carries a comprehension check.
    pub fn has_questions(&self) -> bool {
        !self.comprehension_questions.is_empty()
    }

    /// Find an offered choice by its description.
    pub fn find_choice(&self, description: &str) -> Option<&Choice> {
        self.next_choices
            .iter()
            .find(|c| c.description == description)
    }

    /// Reject a zero sequence and malformed questions.
    pub fn validate(&self) -> CoreResult<()> {
        if self.sequence == 0 {
            return Err(CoreError::InvalidSequence(self.sequence));
        }
        validate_questions(&self.comprehension_questions)
    }
}
