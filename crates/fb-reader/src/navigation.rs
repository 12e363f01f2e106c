//! Which segment indices a reader may view.
//!
//! Readers never move backward (going back and forward again would skip a
//! comprehension check) and never ahead of generated content. A completed
//! session is frozen on its last segment.

use fb_core::Session;

/// Whether the reader at `current` may view `target`.
pub fn can_navigate_to(session: &Session, target: usize, current: usize) -> bool {
    let Some(last) = session.last_index() else {
        return false;
    };
    if session.completed {
        return target == last;
    }
    current <= target && target <= last
}

/// Outcome of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// The reader now views this index.
    Moved(usize),
    /// The request was refused; the reader stays at this index.
    Refused(usize),
}
