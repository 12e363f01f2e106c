//! The progression controller.
//!
//! Decides whether a reader intent may reach the story backend, and applies
//! the backend's answer to the store: the leaving segment's questions are
//! patched and the new segment appended in one commit, the reader advances,
//! and a comprehension gate opens for the new segment when it has questions.
//!
//! A failed backend call leaves the store and every gate exactly as they
//! were, so the same intent can simply be issued again.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use fb_core::{Choice, Session, SessionId, StoryMetadata};
use tracing::{debug, info, warn};

use crate::backend::{ExtensionRequest, StoryAction, StoryBackend};
use crate::config::ReaderConfig;
use crate::error::{ControllerError, ControllerResult, GateError, StoreError};
use crate::gate::{GateBook, GateSnapshot, Submission};
use crate::navigation::{Navigation, can_navigate_to};
use crate::store::SharedStore;

/// Why an intent did not reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// The segment's comprehension check has not been satisfied.
    ComprehensionRequired,
    /// The story has already ended.
    AlreadyCompleted,
    /// Another extension call for this session has not finished.
    ExtensionInFlight,
}

impl BlockReason {
    /// Stable reason code for the rendering layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ComprehensionRequired => "comprehension-required",
            Self::AlreadyCompleted => "already-completed",
            Self::ExtensionInFlight => "extension-in-flight",
        }
    }
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Result of a choice or end-story intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The story grew; the reader is now at `index`.
    Advanced {
        /// Index of the new segment.
        index: usize,
        /// Whether the new segment ended the story.
        completed: bool,
    },
    /// Nothing happened.
    Blocked(BlockReason),
}

impl Progress {
    /// Whether the intent was blocked.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }
}

/// Per-session reading position and gates. Gate outcomes are mirrored into the session.
#[derive(Debug)]
struct ReaderState {
    position: usize,
    gates: GateBook,
}

impl ReaderState {
    /// Pick a session up at its newest segment, with recorded gate outcomes.
    fn resume(session: &Session, max_attempts: u32) -> Self {
        let mut gates = GateBook::new(max_attempts);
        for (&index, record) in &session.gates {
            if let Some(segment) = session.segment(index) {
                gates.restore(index, &segment.comprehension_questions, record);
            }
        }
        let mut state = Self {
            position: session.len().saturating_sub(1),
            gates,
        };
        state.sync(session);
        state
    }

    /// Open a gate for the current position if questions were patched in
    /// since the reader arrived.
    fn sync(&mut self, session: &Session) {
        if self.gates.get(self.position).is_some() {
            return;
        }
        if let Some(segment) = session.segment(self.position)
            && segment.has_questions()
        {
            self.gates
                .open(self.position, &segment.comprehension_questions);
        }
    }
}

/// Marks a session as having an extension call outstanding.
struct InFlight<'a> {
    set: &'a RefCell<HashSet<SessionId>>,
    session_id: SessionId,
}

impl<'a> InFlight<'a> {
    fn acquire(set: &'a RefCell<HashSet<SessionId>>, session_id: &SessionId) -> Option<Self> {
        if !set.borrow_mut().insert(session_id.clone()) {
            return None;
        }
        Some(Self {
            set,
            session_id: session_id.clone(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.borrow_mut().remove(&self.session_id);
    }
}

/// Orchestrates gating, backend calls, and store commits.
pub struct ProgressionController<B> {
    store: SharedStore,
    backend: B,
    config: ReaderConfig,
    readers: RefCell<HashMap<SessionId, ReaderState>>,
    in_flight: RefCell<HashSet<SessionId>>,
}

impl<B: StoryBackend> ProgressionController<B> {
    /// Create a controller over an injected store and backend.
    pub fn new(store: SharedStore, backend: B, config: ReaderConfig) -> Self {
        Self {
            store,
            backend,
            config,
            readers: RefCell::new(HashMap::new()),
            in_flight: RefCell::new(HashSet::new()),
        }
    }

    /// The shared store.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// The story backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Whether an extension call for `session_id` is outstanding.
    pub fn is_in_flight(&self, session_id: &SessionId) -> bool {
        self.in_flight.borrow().contains(session_id)
    }

    /// Start a new story, store it, and make it current.
    pub async fn start_story(&self, metadata: StoryMetadata) -> ControllerResult<SessionId> {
        let opening = self.backend.start(&metadata).await?;
        let session_id = opening.session_id;

        let mut store = self.store.borrow_mut();
        store.create_session(session_id.clone(), opening.segment, metadata)?;
        store.set_current(&session_id)?;
        let session = store.get_session(&session_id)?;
        self.readers.borrow_mut().insert(
            session_id.clone(),
            ReaderState::resume(session, self.config.max_attempts),
        );
        Ok(session_id)
    }

    /// Index of the segment the reader is viewing.
    pub fn position(&self, session_id: &SessionId) -> ControllerResult<usize> {
        self.with_reader(session_id, |state, _| Ok(state.position))
    }

    /// Gate view for the reader's current segment, if it has questions.
    pub fn gate_snapshot(&self, session_id: &SessionId) -> ControllerResult<Option<GateSnapshot>> {
        self.with_reader(session_id, |state, _| {
            Ok(state.gates.get(state.position).map(|g| g.snapshot()))
        })
    }

    /// Record an answer on the current segment's gate.
    pub fn answer(
        &self,
        session_id: &SessionId,
        question: usize,
        option: usize,
    ) -> ControllerResult<()> {
        self.with_reader(session_id, |state, _| {
            let gate = state
                .gates
                .get_mut(state.position)
                .ok_or(GateError::NoQuestions(state.position))?;
            gate.answer(question, option).map_err(Into::into)
        })
    }

    /// Submit the current segment's answers.
    ///
    /// A full submission is recorded on the session.
    pub fn submit(&self, session_id: &SessionId) -> ControllerResult<Submission> {
        let (index, submission, record) = self.with_reader(session_id, |state, _| {
            let gate = state
                .gates
                .get_mut(state.position)
                .ok_or(GateError::NoQuestions(state.position))?;
            let submission = gate.submit()?;
            Ok((state.position, submission, gate.record()))
        })?;
        if submission.all_answered {
            self.store
                .borrow_mut()
                .record_gate(session_id, index, record)?;
        }
        Ok(submission)
    }

    /// Start another attempt on the current segment's gate.
    pub fn retry(&self, session_id: &SessionId) -> ControllerResult<()> {
        let (index, record) = self.with_reader(session_id, |state, _| {
            let gate = state
                .gates
                .get_mut(state.position)
                .ok_or(GateError::NoQuestions(state.position))?;
            gate.retry()?;
            Ok((state.position, gate.record()))
        })?;
        self.store
            .borrow_mut()
            .record_gate(session_id, index, record)?;
        Ok(())
    }

    /// Move the reader to `target` if the navigation guard allows it.
    ///
    /// Arriving at a different index re-opens its gate view; recorded
    /// attempts survive.
    pub fn navigate(&self, session_id: &SessionId, target: usize) -> ControllerResult<Navigation> {
        self.with_reader(session_id, |state, session| {
            if !can_navigate_to(session, target, state.position) {
                warn!(
                    session = %session_id,
                    from = state.position,
                    target,
                    "navigation refused"
                );
                return Ok(Navigation::Refused(state.position));
            }
            if target != state.position {
                state.position = target;
                if let Some(segment) = session.segment(target) {
                    state.gates.open(target, &segment.comprehension_questions);
                }
                debug!(session = %session_id, position = target, "reader moved");
            }
            Ok(Navigation::Moved(target))
        })
    }

    /// Continue the story with one of the segment's choices.
    pub async fn request_choice(
        &self,
        session_id: &SessionId,
        segment_index: usize,
        choice: &Choice,
    ) -> ControllerResult<Progress> {
        let action = StoryAction::Choose {
            description: choice.description.clone(),
        };
        self.advance(session_id, segment_index, action).await
    }

    /// Ask the backend to wrap the story up.
    pub async fn request_end_story(
        &self,
        session_id: &SessionId,
        segment_index: usize,
    ) -> ControllerResult<Progress> {
        self.advance(session_id, segment_index, StoryAction::EndStory)
            .await
    }

    async fn advance(
        &self,
        session_id: &SessionId,
        segment_index: usize,
        action: StoryAction,
    ) -> ControllerResult<Progress> {
        let Some(_in_flight) = InFlight::acquire(&self.in_flight, session_id) else {
            debug!(session = %session_id, "extension already in flight");
            return Ok(Progress::Blocked(BlockReason::ExtensionInFlight));
        };

        let request = match self.prepare(session_id, segment_index, action)? {
            Ok(request) => request,
            Err(reason) => {
                debug!(session = %session_id, segment = segment_index, %reason, "intent blocked");
                return Ok(Progress::Blocked(reason));
            }
        };

        let extension = match self.backend.extend(&request).await {
            Ok(extension) => extension,
            Err(err) => {
                warn!(session = %session_id, error = %err, "story extension failed");
                return Err(err.into());
            }
        };

        let ends_story = extension.is_conclusion || request.action == StoryAction::EndStory;
        let mut segment = extension.segment;
        if segment.choice_made.is_none()
            && let StoryAction::Choose { description } = &request.action
        {
            segment.choice_made = Some(description.clone());
        }

        let (index, completed, questions) = {
            let mut store = self.store.borrow_mut();
            let leaving_has_questions = store
                .get_session(session_id)?
                .segment(segment_index)
                .is_some_and(|s| s.has_questions());
            let patch = (!extension.prior_questions.is_empty() && !leaving_has_questions)
                .then_some(extension.prior_questions);

            let session =
                store.commit_extension(session_id, segment_index, patch, segment, ends_story)?;
            let index = session.len() - 1;
            (
                index,
                session.completed,
                session.segments[index].comprehension_questions.clone(),
            )
        };

        {
            let store = self.store.borrow();
            let session = store.get_session(session_id)?;
            let mut readers = self.readers.borrow_mut();
            let state = readers
                .entry(session_id.clone())
                .or_insert_with(|| ReaderState::resume(session, self.config.max_attempts));
            state.position = index;
            state.gates.open(index, &questions);
        }

        info!(session = %session_id, segment = index, completed, "story advanced");
        Ok(Progress::Advanced { index, completed })
    }

    /// Validate an intent and check its gate. The outer error is a hard
    /// failure; the inner one is a block.
    fn prepare(
        &self,
        session_id: &SessionId,
        segment_index: usize,
        action: StoryAction,
    ) -> ControllerResult<Result<ExtensionRequest, BlockReason>> {
        self.with_reader(session_id, |state, session| {
            if session.completed {
                return Ok(Err(BlockReason::AlreadyCompleted));
            }
            let last = session.len() - 1;
            if segment_index > last {
                return Err(StoreError::IndexOutOfRange {
                    session: session_id.clone(),
                    index: segment_index,
                    len: session.len(),
                }
                .into());
            }
            if segment_index != last {
                return Err(ControllerError::StaleSegment {
                    index: segment_index,
                    last,
                });
            }
            if let StoryAction::Choose { description } = &action
                && session.segments[last].find_choice(description).is_none()
            {
                return Err(ControllerError::InvalidChoice {
                    index: segment_index,
                    choice: description.clone(),
                });
            }
            if !state.gates.is_satisfied(segment_index) {
                return Ok(Err(BlockReason::ComprehensionRequired));
            }
            Ok(Ok(ExtensionRequest {
                session_id: session_id.clone(),
                action,
                metadata: session.metadata.clone(),
            }))
        })
    }

    fn with_reader<R>(
        &self,
        session_id: &SessionId,
        f: impl FnOnce(&mut ReaderState, &Session) -> ControllerResult<R>,
    ) -> ControllerResult<R> {
        let store = self.store.borrow();
        let session = store.get_session(session_id)?;
        let mut readers = self.readers.borrow_mut();
        let state = readers
            .entry(session_id.clone())
            .or_insert_with(|| ReaderState::resume(session, self.config.max_attempts));
        state.sync(session);
        f(state, session)
    }
}
