//! The session store.
//!
//! Owns every session seen during the process lifetime plus the "current"
//! session pointer. The store is constructed once and shared with the
//! controller through a [`SharedStore`] handle; there is no global instance.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::Utc;
use fb_core::{
    ComprehensionQuestion, CoreError, GateRecord, Segment, Session, SessionId, StoryMetadata,
    validate_questions,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

/// Single-threaded shared handle to a store.
pub type SharedStore = Rc<RefCell<SessionStore>>;

/// Flat persisted form of a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Every known session, in creation order.
    #[serde(default)]
    pub sessions: Vec<Session>,
    /// The session the reader was last reading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<SessionId>,
}

/// What [`SessionStore::hydrate`] had to set aside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HydrateReport {
    /// Sessions that failed validation, with the reason.
    pub unusable: Vec<(SessionId, CoreError)>,
    /// Sessions dropped because their id was already taken.
    pub duplicates: Vec<SessionId>,
    /// A current pointer that named no usable session.
    pub dropped_current: Option<SessionId>,
}

impl HydrateReport {
    /// Whether the snapshot restored without losses.
    pub fn is_clean(&self) -> bool {
        self.unusable.is_empty() && self.duplicates.is_empty() && self.dropped_current.is_none()
    }
}

/// Canonical collection of story sessions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Vec<Session>,
    by_id: HashMap<SessionId, usize>,
    quarantined: Vec<(Session, CoreError)>,
    current: Option<SessionId>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the store in a shared handle.
    pub fn shared(self) -> SharedStore {
        Rc::new(RefCell::new(self))
    }

    /// Rebuild a store from a snapshot.
    ///
    /// Sessions that fail validation are quarantined rather than repaired;
    /// every later operation on them reports [`StoreError::Unusable`].
    pub fn hydrate(snapshot: StoreSnapshot) -> (Self, HydrateReport) {
        let mut store = Self::new();
        let mut report = HydrateReport::default();

        for session in snapshot.sessions {
            let id = session.session_id.clone();
            if store.by_id.contains_key(&id) || store.quarantine_reason(&id).is_some() {
                warn!(session = %id, "duplicate session in snapshot dropped");
                report.duplicates.push(id);
                continue;
            }
            match session.validate() {
                Ok(()) => {
                    store.by_id.insert(id, store.sessions.len());
                    store.sessions.push(session);
                }
                Err(err) => {
                    warn!(session = %id, error = %err, "unusable session quarantined");
                    report.unusable.push((id, err.clone()));
                    store.quarantined.push((session, err));
                }
            }
        }

        match snapshot.current {
            Some(id) if store.by_id.contains_key(&id) => store.current = Some(id),
            Some(id) => {
                warn!(session = %id, "current session pointer dropped");
                report.dropped_current = Some(id);
            }
            None => {}
        }

        info!(
            sessions = store.sessions.len(),
            quarantined = store.quarantined.len(),
            "session store hydrated"
        );
        (store, report)
    }

    /// Flatten the store for persistence, quarantined sessions included.
    pub fn snapshot(&self) -> StoreSnapshot {
        let mut sessions = self.sessions.clone();
        sessions.extend(self.quarantined.iter().map(|(s, _)| s.clone()));
        StoreSnapshot {
            sessions,
            current: self.current.clone(),
        }
    }

    /// Number of usable sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store holds no usable sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Usable sessions in creation order.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Ids of quarantined sessions.
    pub fn unusable_ids(&self) -> impl Iterator<Item = &SessionId> {
        self.quarantined.iter().map(|(s, _)| &s.session_id)
    }

    /// Start a session from its opening segment.
    pub fn create_session(
        &mut self,
        session_id: SessionId,
        first: Segment,
        metadata: StoryMetadata,
    ) -> StoreResult<&Session> {
        if self.by_id.contains_key(&session_id) || self.quarantine_reason(&session_id).is_some() {
            return Err(StoreError::Duplicate(session_id));
        }
        first.validate()?;

        let session = Session::new(session_id.clone(), first, metadata);
        info!(session = %session_id, completed = session.completed, "session created");
        let idx = self.sessions.len();
        self.sessions.push(session);
        self.by_id.insert(session_id, idx);
        Ok(&self.sessions[idx])
    }

    /// Look up a session.
    pub fn get_session(&self, session_id: &SessionId) -> StoreResult<&Session> {
        let idx = self.index_of(session_id)?;
        Ok(&self.sessions[idx])
    }

    /// Append a segment to an open session.
    ///
    /// The session completes when `ends_story` is set or the segment offers
    /// no further choices.
    pub fn append_segment(
        &mut self,
        session_id: &SessionId,
        segment: Segment,
        ends_story: bool,
    ) -> StoreResult<&Session> {
        let idx = self.writable_index(session_id)?;
        segment.validate()?;
        self.push_segment(idx, segment, ends_story);
        Ok(&self.sessions[idx])
    }

    /// Replace the comprehension questions of an already-appended segment.
    pub fn patch_comprehension_questions(
        &mut self,
        session_id: &SessionId,
        segment_index: usize,
        questions: Vec<ComprehensionQuestion>,
    ) -> StoreResult<&Session> {
        let idx = self.index_of(session_id)?;
        self.check_segment_index(idx, segment_index)?;
        validate_questions(&questions)?;
        self.apply_patch(idx, segment_index, questions);
        Ok(&self.sessions[idx])
    }

    /// Patch the leaving segment and append the new one as a single step.
    ///
    /// Everything is validated before anything is written, so either both
    /// changes land or neither does. The patch is applied first.
    pub fn commit_extension(
        &mut self,
        session_id: &SessionId,
        prior_index: usize,
        prior_questions: Option<Vec<ComprehensionQuestion>>,
        segment: Segment,
        ends_story: bool,
    ) -> StoreResult<&Session> {
        let idx = self.writable_index(session_id)?;
        self.check_segment_index(idx, prior_index)?;
        if let Some(questions) = &prior_questions {
            validate_questions(questions)?;
        }
        segment.validate()?;

        if let Some(questions) = prior_questions {
            self.apply_patch(idx, prior_index, questions);
        }
        self.push_segment(idx, segment, ends_story);
        Ok(&self.sessions[idx])
    }

    /// Record the comprehension outcome for a segment so it survives reloads.
    pub fn record_gate(
        &mut self,
        session_id: &SessionId,
        segment_index: usize,
        record: GateRecord,
    ) -> StoreResult<()> {
        let idx = self.index_of(session_id)?;
        self.check_segment_index(idx, segment_index)?;
        let session = &mut self.sessions[idx];
        debug!(
            session = %session_id,
            segment = segment_index,
            attempts = record.attempts,
            passed = record.passed,
            "comprehension outcome recorded"
        );
        session.gates.insert(segment_index, record);
        session.updated_at = Utc::now();
        Ok(())
    }

    /// Make `session_id` the current session.
    pub fn set_current(&mut self, session_id: &SessionId) -> StoreResult<()> {
        self.index_of(session_id)?;
        self.current = Some(session_id.clone());
        Ok(())
    }

    /// The current session, if one is set.
    pub fn current(&self) -> Option<&Session> {
        let id = self.current.as_ref()?;
        self.by_id.get(id).map(|&idx| &self.sessions[idx])
    }

    /// Id of the current session.
    pub fn current_id(&self) -> Option<&SessionId> {
        self.current.as_ref()
    }

    fn quarantine_reason(&self, session_id: &SessionId) -> Option<&CoreError> {
        self.quarantined
            .iter()
            .find(|(s, _)| &s.session_id == session_id)
            .map(|(_, err)| err)
    }

    fn index_of(&self, session_id: &SessionId) -> StoreResult<usize> {
        if let Some(&idx) = self.by_id.get(session_id) {
            return Ok(idx);
        }
        match self.quarantine_reason(session_id) {
            Some(err) => Err(StoreError::Unusable(session_id.clone(), err.clone())),
            None => Err(StoreError::NotFound(session_id.clone())),
        }
    }

    fn writable_index(&self, session_id: &SessionId) -> StoreResult<usize> {
        let idx = self.index_of(session_id)?;
        if self.sessions[idx].completed {
            return Err(StoreError::Completed(session_id.clone()));
        }
        Ok(idx)
    }

    fn check_segment_index(&self, idx: usize, segment_index: usize) -> StoreResult<()> {
        let session = &self.sessions[idx];
        if segment_index >= session.len() {
            return Err(StoreError::IndexOutOfRange {
                session: session.session_id.clone(),
                index: segment_index,
                len: session.len(),
            });
        }
        Ok(())
    }

    fn apply_patch(&mut self, idx: usize, segment_index: usize, questions: Vec<ComprehensionQuestion>) {
        let session = &mut self.sessions[idx];
        info!(
            session = %session.session_id,
            segment = segment_index,
            questions = questions.len(),
            "comprehension questions patched"
        );
        session.segments[segment_index].comprehension_questions = questions;
        session.updated_at = Utc::now();
    }

    fn push_segment(&mut self, idx: usize, segment: Segment, ends_story: bool) {
        let session = &mut self.sessions[idx];
        if let Some(last) = session.last_segment()
            && segment.sequence <= last.sequence
        {
            warn!(
                session = %session.session_id,
                previous = last.sequence,
                sequence = segment.sequence,
                "segment sequence did not increase"
            );
        }
        session.completed = ends_story || segment.is_ending();
        session.segments.push(segment);
        session.updated_at = Utc::now();
        info!(
            session = %session.session_id,
            segments = session.len(),
            completed = session.completed,
            "segment appended"
        );
    }
}
