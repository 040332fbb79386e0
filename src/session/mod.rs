//! Interaction loop.
//!
//! Presents proposals for each question step, collects replies and records
//! [`ConfirmedAnswer`]s. Progress can be checkpointed after every answer and
//! resumed later without asking answered steps again.

mod answer;
mod error;
mod interactor;
mod runner;

pub use answer::{AnswerOrigin, AnswerSet, ConfirmedAnswer};
pub use error::SessionError;
pub use interactor::{AutoInteractor, Interactor, Prompt, Reply, ScriptedInteractor, TerminalInteractor};
pub use runner::{Session, SessionSettings, SessionState};
