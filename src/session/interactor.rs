//! Human interaction collaborators.
//!
//! The session only talks to an [`Interactor`]: a terminal, a scripted queue
//! in tests, or an automatic responder for non-interactive runs.

use std::collections::{BTreeMap, VecDeque};
use std::io::{BufRead, Write};

use super::SessionError;
use crate::propose::Proposal;

/// What the human is asked for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    /// Step being answered
    pub step_id: String,

    /// Question text
    pub text: String,

    /// Proposals on offer, best first; empty means plain prompting
    pub proposals: Vec<Proposal>,

    /// Step default, if the definition has one
    pub default: Option<String>,

    /// Why the previous reply was not accepted
    pub retry_reason: Option<String>,
}

impl Prompt {
    /// Check if any proposal is on offer.
    pub fn has_proposals(&self) -> bool {
        !self.proposals.is_empty()
    }
}

/// A reply to a [`Prompt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Accept the top proposal
    Confirm,
    /// Accept the proposal at this index
    Select(usize),
    /// Accept the top proposal with a changed value
    Edit(String),
    /// Supply a value directly
    Manual(String),
    /// Reject every proposal and enter a value instead
    Reject,
}

/// Presents prompts and returns replies.
pub trait Interactor {
    /// Ask one question.
    ///
    /// Returning [`SessionError::Interrupted`] stops the session with every
    /// recorded answer intact.
    fn ask(&mut self, prompt: &Prompt) -> Result<Reply, SessionError>;
}

/// Line-based interaction over any reader and writer.
pub struct TerminalInteractor<R, W> {
    input: R,
    output: W,
}

impl TerminalInteractor<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Interact over stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalInteractor<R, W> {
    /// Create an interactor over the given streams.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Consume the interactor, returning the output stream.
    pub fn into_output(self) -> W {
        self.output
    }

    fn render(&mut self, prompt: &Prompt) -> std::io::Result<()> {
        writeln!(self.output)?;
        if let Some(reason) = &prompt.retry_reason {
            writeln!(self.output, "  ! {reason}")?;
        }
        writeln!(self.output, "[{}] {}", prompt.step_id, prompt.text)?;

        if prompt.has_proposals() {
            for (i, proposal) in prompt.proposals.iter().enumerate() {
                writeln!(
                    self.output,
                    "  {}) {} ({:.0}%) from {}",
                    i + 1,
                    proposal.value,
                    proposal.confidence * 100.0,
                    proposal.summary()
                )?;
            }
            write!(self.output, "Enter = accept 1, number = pick, r = reject all, or type a new value: ")?;
        } else if let Some(default) = &prompt.default {
            write!(self.output, "[{default}] > ")?;
        } else {
            write!(self.output, "> ")?;
        }
        self.output.flush()
    }
}

impl<R: BufRead, W: Write> Interactor for TerminalInteractor<R, W> {
    fn ask(&mut self, prompt: &Prompt) -> Result<Reply, SessionError> {
        self.render(prompt)?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(SessionError::Interrupted);
        }
        Ok(parse_reply(line.trim(), prompt))
    }
}

/// Interpret one line of terminal input.
fn parse_reply(input: &str, prompt: &Prompt) -> Reply {
    if !prompt.has_proposals() {
        return match (&prompt.default, input.is_empty()) {
            (Some(default), true) => Reply::Manual(default.clone()),
            _ => Reply::Manual(input.to_string()),
        };
    }

    if input.is_empty() {
        return Reply::Confirm;
    }
    if input.eq_ignore_ascii_case("r") || input.eq_ignore_ascii_case("reject") {
        return Reply::Reject;
    }
    if let Ok(n) = input.parse::<usize>() {
        if (1..=prompt.proposals.len()).contains(&n) {
            return Reply::Select(n - 1);
        }
    }
    Reply::Edit(input.to_string())
}

/// Non-interactive responder.
///
/// Uses preset answers first, then confirms the top proposal, then falls
/// back to the step default. Anything else, including a second attempt at a
/// step whose first reply was refused, is [`SessionError::MissingInput`].
#[derive(Debug, Clone, Default)]
pub struct AutoInteractor {
    answers: BTreeMap<String, String>,
}

impl AutoInteractor {
    /// Create a responder with no preset answers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset answers keyed by step id.
    #[must_use]
    pub fn with_answers(mut self, answers: BTreeMap<String, String>) -> Self {
        self.answers = answers;
        self
    }
}

impl Interactor for AutoInteractor {
    fn ask(&mut self, prompt: &Prompt) -> Result<Reply, SessionError> {
        // Nothing changes between attempts, so a refused reply is final.
        if prompt.retry_reason.is_some() {
            return Err(SessionError::MissingInput { step: prompt.step_id.clone() });
        }
        if let Some(value) = self.answers.get(&prompt.step_id) {
            return Ok(match prompt.proposals.first() {
                Some(top) if top.value == *value => Reply::Confirm,
                Some(_) => Reply::Edit(value.clone()),
                None => Reply::Manual(value.clone()),
            });
        }
        if prompt.has_proposals() {
            return Ok(Reply::Confirm);
        }
        match &prompt.default {
            Some(default) => Ok(Reply::Manual(default.clone())),
            None => Err(SessionError::MissingInput { step: prompt.step_id.clone() }),
        }
    }
}

/// Replays a fixed queue of replies; an empty queue interrupts the session.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInteractor {
    replies: VecDeque<Reply>,
    asked: Vec<Prompt>,
}

impl ScriptedInteractor {
    /// Create an interactor replaying `replies` in order.
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self { replies: replies.into_iter().collect(), asked: Vec::new() }
    }

    /// Every prompt seen so far.
    pub fn prompts(&self) -> &[Prompt] {
        &self.asked
    }

    /// Replies not yet used.
    pub fn remaining(&self) -> usize {
        self.replies.len()
    }
}

impl Interactor for ScriptedInteractor {
    fn ask(&mut self, prompt: &Prompt) -> Result<Reply, SessionError> {
        self.asked.push(prompt.clone());
        self.replies.pop_front().ok_or(SessionError::Interrupted)
    }
}
