//! Comprehension gates.
//!
//! A gate belongs to one segment index of one session. It opens when the
//! reader arrives at a segment carrying questions and stops blocking
//! progression once the reader has submitted a full set of answers, or has
//! used up every attempt.
//!
//! ```text
//! Closed ──► Open ──submit──► Submitted ──retry──► Open
//!                                 │
//!                                 └──(perfect or out of attempts)──► Locked
//! ```

use std::collections::BTreeMap;

use fb_core::{ComprehensionQuestion, GateRecord};
use serde::Serialize;
use tracing::debug;

use crate::error::{GateError, GateResult};

/// Where a gate stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    /// Waiting for the reader's answers.
    Open,
    /// Answers submitted and a retry is still on offer.
    Submitted,
    /// No further submissions possible for this segment.
    Locked,
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Submitted => write!(f, "submitted"),
            Self::Locked => write!(f, "locked"),
        }
    }
}

/// Number of correct answers out of the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    /// Correctly answered questions.
    pub correct: usize,
    /// Questions in the check.
    pub total: usize,
}

impl Score {
    /// Whether every question was answered correctly.
    pub fn is_perfect(&self) -> bool {
        self.correct == self.total
    }
}

/// Result of a submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Submission {
    /// False when some question had no answer; nothing was recorded then.
    pub all_answered: bool,
    /// Correct answers in this submission.
    pub correct_count: usize,
    /// Questions in the check.
    pub total: usize,
}

/// Read-only view of a gate for the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateSnapshot {
    /// Lifecycle state.
    pub state: GateState,
    /// Submissions so far.
    pub attempts: u32,
    /// Allowed submissions.
    pub max_attempts: u32,
    /// Selected option per question index.
    pub answers: BTreeMap<usize, usize>,
    /// Whether the current attempt was submitted.
    pub passed: bool,
    /// Whether a retry is on offer.
    pub can_retry: bool,
    /// Whether progression is unlocked.
    pub satisfied: bool,
    /// Score of the latest submission.
    pub last_score: Option<Score>,
}

/// Comprehension check for a single segment.
#[derive(Debug, Clone)]
pub struct ComprehensionGate {
    questions: Vec<ComprehensionQuestion>,
    max_attempts: u32,
    attempts: u32,
    answers: BTreeMap<usize, usize>,
    passed: bool,
    last_score: Option<Score>,
}

impl ComprehensionGate {
    /// Open a fresh gate over `questions` with no attempts recorded.
    pub fn open(questions: Vec<ComprehensionQuestion>, max_attempts: u32) -> Self {
        Self {
            questions,
            max_attempts,
            attempts: 0,
            answers: BTreeMap::new(),
            passed: false,
            last_score: None,
        }
    }

    /// Rebuild a gate from a recorded outcome. No answers are selected.
    pub fn restore(
        questions: Vec<ComprehensionQuestion>,
        max_attempts: u32,
        record: &GateRecord,
    ) -> Self {
        let total = questions.len();
        Self {
            questions,
            max_attempts,
            attempts: record.attempts.min(max_attempts),
            answers: BTreeMap::new(),
            passed: record.passed,
            last_score: record.last_correct.map(|correct| Score { correct, total }),
        }
    }

    /// The outcome worth keeping across reloads.
    pub fn record(&self) -> GateRecord {
        GateRecord {
            attempts: self.attempts,
            passed: self.passed,
            last_correct: self.last_score.map(|s| s.correct),
        }
    }

    /// The questions this gate checks.
    pub fn questions(&self) -> &[ComprehensionQuestion] {
        &self.questions
    }

    /// Submissions so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether the current attempt was submitted.
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Selected option per question index.
    pub fn answers(&self) -> &BTreeMap<usize, usize> {
        &self.answers
    }

    /// Score of the latest submission.
    pub fn last_score(&self) -> Option<Score> {
        self.last_score
    }

    /// Question indices still lacking an answer.
    pub fn unanswered(&self) -> Vec<usize> {
        (0..self.questions.len())
            .filter(|i| !self.answers.contains_key(i))
            .collect()
    }

    /// Record or overwrite the answer to one question.
    pub fn answer(&mut self, question: usize, option: usize) -> GateResult<()> {
        if self.state() != GateState::Open {
            return Err(GateError::NotOpen);
        }
        let q = self
            .questions
            .get(question)
            .ok_or(GateError::QuestionOutOfRange {
                index: question,
                total: self.questions.len(),
            })?;
        if option >= q.options.len() {
            return Err(GateError::OptionOutOfRange {
                question,
                option,
                total: q.options.len(),
            });
        }
        self.answers.insert(question, option);
        Ok(())
    }

    /// Submit the current answers.
    ///
    /// With a question unanswered this reports `all_answered: false` and
    /// leaves the gate untouched.
    pub fn submit(&mut self) -> GateResult<Submission> {
        match self.state() {
            GateState::Open => {}
            GateState::Submitted => return Err(GateError::AlreadySubmitted),
            GateState::Locked if self.passed => return Err(GateError::AlreadySubmitted),
            GateState::Locked => return Err(GateError::NotOpen),
        }

        let total = self.questions.len();
        if self.answers.len() < total {
            return Ok(Submission {
                all_answered: false,
                correct_count: 0,
                total,
            });
        }

        let correct = self
            .questions
            .iter()
            .enumerate()
            .filter(|(i, q)| self.answers.get(i).is_some_and(|&a| q.is_correct(a)))
            .count();

        self.attempts = (self.attempts + 1).min(self.max_attempts);
        self.passed = true;
        self.last_score = Some(Score { correct, total });
        debug!(
            attempts = self.attempts,
            correct, total, "comprehension answers submitted"
        );

        Ok(Submission {
            all_answered: true,
            correct_count: correct,
            total,
        })
    }

    /// Whether the reader may try again: submitted, imperfect, attempts left.
    pub fn can_retry(&self) -> bool {
        self.passed
            && self.last_score.is_some_and(|s| !s.is_perfect())
            && self.attempts < self.max_attempts
    }

    /// Clear answers for another attempt. Attempts are kept.
    pub fn retry(&mut self) -> GateResult<()> {
        if !self.can_retry() {
            return Err(GateError::RetryUnavailable);
        }
        self.answers.clear();
        self.passed = false;
        debug!(attempts = self.attempts, "comprehension retry started");
        Ok(())
    }

    /// Whether this gate no longer blocks progression.
    pub fn is_satisfied(&self) -> bool {
        self.passed || self.attempts >= self.max_attempts
    }

    /// Lifecycle state derived from attempts, answers, and score.
    pub fn state(&self) -> GateState {
        if self.passed {
            if self.can_retry() {
                GateState::Submitted
            } else {
                GateState::Locked
            }
        } else if self.attempts >= self.max_attempts {
            GateState::Locked
        } else {
            GateState::Open
        }
    }

    /// Reset the view when the reader returns to this segment.
    ///
    /// Unsubmitted answers are dropped; attempts and pass state persist.
    pub fn reopen_view(&mut self) {
        if !self.passed {
            self.answers.clear();
        }
    }

    /// Read-only view for rendering.
    pub fn snapshot(&self) -> GateSnapshot {
        GateSnapshot {
            state: self.state(),
            attempts: self.attempts,
            max_attempts: self.max_attempts,
            answers: self.answers.clone(),
            passed: self.passed,
            can_retry: self.can_retry(),
            satisfied: self.is_satisfied(),
            last_score: self.last_score,
        }
    }
}

/// All gates of one session, keyed by segment index.
#[derive(Debug, Clone)]
pub struct GateBook {
    max_attempts: u32,
    gates: BTreeMap<usize, ComprehensionGate>,
}

impl GateBook {
    /// Create an empty book.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            gates: BTreeMap::new(),
        }
    }

    /// Arrive at segment `index`.
    ///
    /// A segment without questions has no gate. A gate already recorded for
    /// the index keeps its attempts and only has its view reset.
    pub fn open(
        &mut self,
        index: usize,
        questions: &[ComprehensionQuestion],
    ) -> Option<&ComprehensionGate> {
        if questions.is_empty() && !self.gates.contains_key(&index) {
            return None;
        }
        let max_attempts = self.max_attempts;
        let gate = self
            .gates
            .entry(index)
            .and_modify(ComprehensionGate::reopen_view)
            .or_insert_with(|| {
                debug!(index, questions = questions.len(), "comprehension gate opened");
                ComprehensionGate::open(questions.to_vec(), max_attempts)
            });
        Some(gate)
    }

    /// Install a gate at `index` from a recorded outcome.
    pub fn restore(
        &mut self,
        index: usize,
        questions: &[ComprehensionQuestion],
        record: &GateRecord,
    ) {
        if questions.is_empty() {
            return;
        }
        self.gates.insert(
            index,
            ComprehensionGate::restore(questions.to_vec(), self.max_attempts, record),
        );
    }

    /// Gate at `index`, if the segment has one.
    pub fn get(&self, index: usize) -> Option<&ComprehensionGate> {
        self.gates.get(&index)
    }

    /// Mutable gate at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut ComprehensionGate> {
        self.gates.get_mut(&index)
    }

    /// Whether progression past `index` is unlocked. No gate means unlocked.
    pub fn is_satisfied(&self, index: usize) -> bool {
        self.gates.get(&index).is_none_or(ComprehensionGate::is_satisfied)
    }
}
