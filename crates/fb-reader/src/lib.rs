//! Story session state machine for Fabula.
//!
//! Tracks a reader through a branching, segment-by-segment story: the
//! [`SessionStore`] owns sessions, the [`ProgressionController`] decides
//! whether a reader intent may extend the story, per-segment
//! [`ComprehensionGate`]s hold progression until the reader has answered,
//! and the navigation guard keeps the reader from skipping around.

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod gate;
pub mod navigation;
pub mod persist;
pub mod store;

pub use backend::{Extension, ExtensionRequest, Opening, StoryAction, StoryBackend};
pub use config::ReaderConfig;
pub use controller::{BlockReason, Progress, ProgressionController};
pub use error::{
    ControllerError, ControllerResult, ExtensionError, GateError, GateResult, PersistError,
    StoreError, StoreResult,
};
pub use gate::{ComprehensionGate, GateBook, GateSnapshot, GateState, Score, Submission};
pub use navigation::{Navigation, can_navigate_to};
pub use persist::{load_snapshot, save_snapshot};
pub use store::{HydrateReport, SessionStore, SharedStore, StoreSnapshot};
