//! The interaction loop.
//!
//! Walks the question steps of a resolved workflow strictly in order and
//! turns replies into [`ConfirmedAnswer`]s.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{AnswerSet, ConfirmedAnswer, Interactor, Prompt, Reply, SessionError};
use crate::core::config::{ArtifactConfig, ProposalConfig};
use crate::propose::{Proposal, ProposalSet};
use crate::workflow::{ResolvedWorkflow, Step};

/// Settings that shape how replies become answers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
    /// Proposals below this confidence are not offered
    pub min_confidence: f64,

    /// Confidence recorded for manually entered answers
    pub manual_confidence: f64,
}

impl SessionSettings {
    /// Settings from the proposal and artifact configuration.
    pub fn from_config(proposals: &ProposalConfig, artifacts: &ArtifactConfig) -> Self {
        Self {
            min_confidence: proposals.min_confidence,
            manual_confidence: artifacts.manual_confidence,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&ProposalConfig::default(), &ArtifactConfig::default())
    }
}

/// Persistable progress of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Workflow the answers belong to
    pub workflow: String,

    /// Answers recorded so far, in step order
    pub answers: Vec<ConfirmedAnswer>,
}

impl SessionState {
    /// Empty state for a workflow.
    pub fn new(workflow: impl Into<String>) -> Self {
        Self { workflow: workflow.into(), answers: Vec::new() }
    }

    /// Load state saved by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| SessionError::State(format!("{}: {e}", path.display())))
    }

    /// Save state, replacing the file atomically.
    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| SessionError::State(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, content)?;
        std::fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Check if a step already has an answer.
    pub fn is_answered(&self, step_id: &str) -> bool {
        self.answers.iter().any(|a| a.step_id() == step_id)
    }
}

type Checkpoint<'a> = Box<dyn FnMut(&SessionState) -> Result<(), SessionError> + 'a>;

/// Drives the question steps of one workflow run.
pub struct Session<'a> {
    workflow: &'a ResolvedWorkflow,
    proposals: &'a ProposalSet,
    settings: SessionSettings,
    state: SessionState,
    checkpoint: Option<Checkpoint<'a>>,
}

impl<'a> Session<'a> {
    /// Start a fresh session.
    pub fn new(
        workflow: &'a ResolvedWorkflow,
        proposals: &'a ProposalSet,
        settings: SessionSettings,
    ) -> Self {
        let state = SessionState::new(workflow.name.clone());
        Self { workflow, proposals, settings, state, checkpoint: None }
    }

    /// Continue from saved state; answered steps are not asked again.
    ///
    /// Answers to steps the workflow no longer has are dropped.
    pub fn resume(
        workflow: &'a ResolvedWorkflow,
        proposals: &'a ProposalSet,
        settings: SessionSettings,
        mut state: SessionState,
    ) -> Result<Self, SessionError> {
        if state.workflow != workflow.name {
            return Err(SessionError::State(format!(
                "state belongs to workflow '{}', not '{}'",
                state.workflow, workflow.name
            )));
        }
        state.answers.retain(|a| workflow.step(a.step_id()).is_some_and(Step::is_question));
        tracing::info!(workflow = workflow.name.as_str(), answered = state.answers.len(), "Resuming session");
        Ok(Self { workflow, proposals, settings, state, checkpoint: None })
    }

    /// Call `f` with the current state after every recorded answer.
    #[must_use]
    pub fn on_checkpoint(
        mut self,
        f: impl FnMut(&SessionState) -> Result<(), SessionError> + 'a,
    ) -> Self {
        self.checkpoint = Some(Box::new(f));
        self
    }

    /// Current progress.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Consume the session, returning its progress.
    pub fn into_state(self) -> SessionState {
        self.state
    }

    /// First question step without an answer.
    pub fn next_step(&self) -> Option<&'a Step> {
        let workflow: &'a ResolvedWorkflow = self.workflow;
        workflow.questions().find(|s| !self.state.is_answered(&s.id))
    }

    /// Whether every question step has an answer.
    pub fn is_complete(&self) -> bool {
        self.next_step().is_none()
    }

    /// Proposals offered for a step: those at or above the minimum confidence.
    pub fn offered(&self, step_id: &str) -> Vec<Proposal> {
        self.proposals
            .for_step(step_id)
            .iter()
            .filter(|p| p.confidence >= self.settings.min_confidence)
            .cloned()
            .collect()
    }

    /// Ask every unanswered question in order.
    ///
    /// On error, answers recorded so far stay in [`state`](Self::state).
    pub fn run(&mut self, interactor: &mut dyn Interactor) -> Result<(), SessionError> {
        while let Some(step) = self.next_step() {
            let answer = self.ask_step(step, interactor)?;
            tracing::info!(
                step = answer.step_id(),
                origin = %answer.origin(),
                confidence = answer.confidence(),
                "Answer recorded"
            );
            self.state.answers.push(answer);
            if let Some(checkpoint) = self.checkpoint.as_mut() {
                checkpoint(&self.state)?;
            }
        }
        Ok(())
    }

    /// The finished answer set, in workflow order.
    pub fn finish(self) -> Result<AnswerSet, SessionError> {
        if let Some(step) = self.next_step() {
            return Err(SessionError::MissingInput { step: step.id.clone() });
        }
        let mut answers = self.state.answers;
        answers.sort_by_key(|a| self.workflow.index_of(a.step_id()));
        Ok(AnswerSet::from_answers(answers))
    }

    fn ask_step(
        &self,
        step: &Step,
        interactor: &mut dyn Interactor,
    ) -> Result<ConfirmedAnswer, SessionError> {
        let mut prompt = Prompt {
            step_id: step.id.clone(),
            text: step.prompt.clone(),
            proposals: self.offered(&step.id),
            default: step.default.clone(),
            retry_reason: None,
        };
        if prompt.proposals.is_empty() {
            tracing::debug!(step = step.id.as_str(), "No proposal on offer, prompting plainly");
        }

        loop {
            let reply = interactor.ask(&prompt)?;
            match self.apply_reply(&step.id, &prompt.proposals, reply) {
                Ok(answer) => return Ok(answer),
                Err(Retry::Again(reason)) => prompt.retry_reason = Some(reason),
                Err(Retry::Rejected) => {
                    prompt.proposals.clear();
                    prompt.retry_reason = Some("All proposals rejected; enter a value".to_string());
                }
            }
        }
    }

    fn apply_reply(
        &self,
        step_id: &str,
        offered: &[Proposal],
        reply: Reply,
    ) -> Result<ConfirmedAnswer, Retry> {
        match reply {
            Reply::Confirm => offered
                .first()
                .map(ConfirmedAnswer::proposed)
                .ok_or_else(|| Retry::Again("Nothing to confirm; enter a value".to_string())),
            Reply::Select(index) => offered
                .get(index)
                .map(ConfirmedAnswer::proposed)
                .ok_or_else(|| Retry::Again(format!("No proposal number {}", index + 1))),
            Reply::Edit(value) => {
                let value = value.trim();
                if value.is_empty() {
                    return Err(Retry::Again("An answer cannot be empty".to_string()));
                }
                Ok(match offered.first() {
                    Some(top) if top.value == value => ConfirmedAnswer::proposed(top),
                    Some(top) => ConfirmedAnswer::edited(top, value),
                    None => ConfirmedAnswer::manual(step_id, value, self.settings.manual_confidence),
                })
            }
            Reply::Manual(value) => {
                let value = value.trim();
                if value.is_empty() {
                    return Err(Retry::Again("An answer cannot be empty".to_string()));
                }
                Ok(ConfirmedAnswer::manual(step_id, value, self.settings.manual_confidence))
            }
            Reply::Reject if offered.is_empty() => {
                Err(Retry::Again("Nothing to reject; enter a value".to_string()))
            }
            Reply::Reject => Err(Retry::Rejected),
        }
    }
}

enum Retry {
    Again(String),
    Rejected,
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("workflow", &self.workflow.name)
            .field("settings", &self.settings)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
