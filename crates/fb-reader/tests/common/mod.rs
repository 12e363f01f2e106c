#![allow(dead_code, missing_docs)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use fb_core::{Choice, ComprehensionQuestion, Segment, StoryMetadata};
use fb_reader::{
    Extension, ExtensionError, ExtensionRequest, Opening, ProgressionController, ReaderConfig,
    SessionStore, StoryBackend,
};

/// Backend that replays queued answers and records what it was asked.
#[derive(Default)]
pub struct ScriptedBackend {
    openings: Mutex<VecDeque<Result<Opening, ExtensionError>>>,
    replies: Mutex<VecDeque<Result<Extension, ExtensionError>>>,
    requests: Mutex<Vec<ExtensionRequest>>,
    yield_before_reply: bool,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend once inside `extend`, so a second intent can run meanwhile.
    pub fn yielding() -> Self {
        Self {
            yield_before_reply: true,
            ..Self::default()
        }
    }

    pub fn open_with(&self, session_id: &str, segment: Segment) {
        self.openings.lock().unwrap().push_back(Ok(Opening {
            session_id: session_id.into(),
            segment,
        }));
    }

    pub fn reply(&self, reply: Result<Extension, ExtensionError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn requests(&self) -> Vec<ExtensionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl StoryBackend for ScriptedBackend {
    async fn start(&self, _metadata: &StoryMetadata) -> Result<Opening, ExtensionError> {
        self.openings
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ExtensionError::Network("no opening scripted".into())))
    }

    async fn extend(&self, request: &ExtensionRequest) -> Result<Extension, ExtensionError> {
        if self.yield_before_reply {
            tokio::task::yield_now().await;
        }
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ExtensionError::Network("no reply scripted".into())))
    }
}

pub fn ab_choices() -> Vec<Choice> {
    vec![
        Choice::new("A", "Follow the fox"),
        Choice::new("B", "Climb the tree"),
    ]
}

pub fn three_questions() -> Vec<ComprehensionQuestion> {
    vec![
        ComprehensionQuestion::new("Who woke up?", ["Pip", "Mo"], 0),
        ComprehensionQuestion::new("Where?", ["forest", "sea", "sky"], 1),
        ComprehensionQuestion::new("What glowed?", ["stone", "lantern"], 1),
    ]
}

pub fn opening() -> Segment {
    Segment::new(1, "Pip woke up in the forest.").with_choices(ab_choices())
}

pub fn next_segment(sequence: u32) -> Extension {
    Extension {
        segment: Segment::new(sequence, "The path went on.").with_choices(ab_choices()),
        prior_questions: Vec::new(),
        is_conclusion: false,
    }
}

pub fn ending_segment(sequence: u32) -> Extension {
    Extension {
        segment: Segment::new(sequence, "And Pip went home to sleep."),
        prior_questions: Vec::new(),
        is_conclusion: true,
    }
}

/// Controller over a fresh store holding one session "s1" started from `first`.
pub async fn controller_with(
    first: Segment,
    backend: ScriptedBackend,
) -> ProgressionController<ScriptedBackend> {
    backend.open_with("s1", first);
    let controller =
        ProgressionController::new(SessionStore::new().shared(), backend, ReaderConfig::default());
    controller
        .start_story(StoryMetadata::new("Pip", "forest", "lantern").with_age(6))
        .await
        .unwrap();
    controller
}
