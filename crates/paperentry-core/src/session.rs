//! Session state: phase, per-paper results, and the generation ticket that
//! keeps stale runs from writing into a newer session.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::PaperMetadata;

/// Overall phase of a conversion session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Analyzing,
    Processing,
    Finished,
    Failed,
}

/// Status of one paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Processing,
    Success { content: String },
    Error { message: String },
}

impl ItemStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Processing => "processing",
            ItemStatus::Success { .. } => "success",
            ItemStatus::Error { .. } => "error",
        }
    }
}

/// One paper within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperResult {
    pub id: Uuid,
    pub metadata: PaperMetadata,
    #[serde(flatten)]
    pub status: ItemStatus,
}

impl PaperResult {
    pub fn pending(metadata: PaperMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            metadata,
            status: ItemStatus::Pending,
        }
    }

    /// The extracted block, for successful items.
    pub fn content(&self) -> Option<&str> {
        match &self.status {
            ItemStatus::Success { content } => Some(content),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            ItemStatus::Error { message } => Some(message),
            _ => None,
        }
    }
}

/// A consistent copy of session state, published after every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub phase: Phase,
    pub results: Vec<PaperResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionSnapshot {
    fn idle(generation: u64) -> Self {
        Self {
            generation,
            phase: Phase::Idle,
            results: Vec::new(),
            error: None,
        }
    }

    pub fn processing_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == ItemStatus::Processing)
            .count()
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.content().is_some()).count()
    }

    pub fn error_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.error_message().is_some())
            .count()
    }
}

/// Proof that a run was started by [`Session::begin`]. Goes stale once the
/// session is reset or begun again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTicket {
    generation: u64,
}

impl SessionTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The ticket belongs to a discarded session.
    #[error("session generation {ticket} is stale (current {current})")]
    Stale { ticket: u64, current: u64 },
    #[error("cannot {action} while {phase:?}")]
    InvalidPhase { action: &'static str, phase: Phase },
    #[error("cannot {action} item {position}: {reason}")]
    InvalidItem {
        action: &'static str,
        position: usize,
        reason: &'static str,
    },
}

/// Mutable session state shared between a running conversion and its observers.
#[derive(Debug)]
pub struct Session {
    state: Mutex<SessionSnapshot>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionSnapshot::idle(0)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionSnapshot> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().clone()
    }

    pub fn is_current(&self, ticket: SessionTicket) -> bool {
        self.lock().generation == ticket.generation
    }

    /// Discard prior results and error and enter `Analyzing`.
    pub fn begin(&self) -> (SessionTicket, SessionSnapshot) {
        let mut state = self.lock();
        let generation = state.generation + 1;
        *state = SessionSnapshot {
            phase: Phase::Analyzing,
            ..SessionSnapshot::idle(generation)
        };
        (SessionTicket { generation }, state.clone())
    }

    /// Discard everything and return to `Idle`. Any outstanding ticket goes stale.
    pub fn reset(&self) -> SessionSnapshot {
        let mut state = self.lock();
        *state = SessionSnapshot::idle(state.generation + 1);
        state.clone()
    }

    /// Analysis finished: one pending result per paper, enter `Processing`.
    pub fn analysis_succeeded(
        &self,
        ticket: SessionTicket,
        papers: Vec<PaperMetadata>,
    ) -> Result<SessionSnapshot, TransitionError> {
        self.update(ticket, "record analysis", |state| {
            require_phase(state, Phase::Analyzing, "record analysis")?;
            state.results = papers.into_iter().map(PaperResult::pending).collect();
            state.phase = Phase::Processing;
            Ok(())
        })
    }

    /// Analysis failed: capture the message and enter `Failed`.
    pub fn analysis_failed(
        &self,
        ticket: SessionTicket,
        message: String,
    ) -> Result<SessionSnapshot, TransitionError> {
        self.update(ticket, "record analysis failure", |state| {
            require_phase(state, Phase::Analyzing, "record analysis failure")?;
            state.error = Some(message);
            state.phase = Phase::Failed;
            Ok(())
        })
    }

    /// Mark the pending item at `position` as `Processing`.
    pub fn start_item(
        &self,
        ticket: SessionTicket,
        position: usize,
    ) -> Result<SessionSnapshot, TransitionError> {
        const ACTION: &str = "start";
        self.update(ticket, ACTION, |state| {
            require_phase(state, Phase::Processing, ACTION)?;
            if state.processing_count() > 0 {
                return Err(invalid_item(ACTION, position, "another item is processing"));
            }
            let item = state
                .results
                .get_mut(position)
                .ok_or_else(|| invalid_item(ACTION, position, "no such item"))?;
            if item.status != ItemStatus::Pending {
                return Err(invalid_item(ACTION, position, "item is not pending"));
            }
            item.status = ItemStatus::Processing;
            Ok(())
        })
    }

    /// Record the outcome of the item at `position`, which must be `Processing`.
    pub fn finish_item(
        &self,
        ticket: SessionTicket,
        position: usize,
        outcome: ItemStatus,
    ) -> Result<SessionSnapshot, TransitionError> {
        const ACTION: &str = "finish";
        self.update(ticket, ACTION, |state| {
            require_phase(state, Phase::Processing, ACTION)?;
            if matches!(outcome, ItemStatus::Pending | ItemStatus::Processing) {
                return Err(invalid_item(ACTION, position, "outcome must be final"));
            }
            let item = state
                .results
                .get_mut(position)
                .ok_or_else(|| invalid_item(ACTION, position, "no such item"))?;
            if item.status != ItemStatus::Processing {
                return Err(invalid_item(ACTION, position, "item is not processing"));
            }
            item.status = outcome;
            Ok(())
        })
    }

    /// Every item has a final status: enter `Finished`.
    pub fn finish(&self, ticket: SessionTicket) -> Result<SessionSnapshot, TransitionError> {
        const ACTION: &str = "finish session";
        self.update(ticket, ACTION, |state| {
            require_phase(state, Phase::Processing, ACTION)?;
            if let Some(position) = state
                .results
                .iter()
                .position(|r| matches!(r.status, ItemStatus::Pending | ItemStatus::Processing))
            {
                return Err(invalid_item(ACTION, position, "item not yet processed"));
            }
            state.phase = Phase::Finished;
            Ok(())
        })
    }

    /// Apply `f` if `ticket` is current; the whole update happens under one lock.
    fn update(
        &self,
        ticket: SessionTicket,
        action: &'static str,
        f: impl FnOnce(&mut SessionSnapshot) -> Result<(), TransitionError>,
    ) -> Result<SessionSnapshot, TransitionError> {
        let mut state = self.lock();
        if state.generation != ticket.generation {
            tracing::debug!(
                action,
                ticket = ticket.generation,
                current = state.generation,
                "ignoring stale session update"
            );
            return Err(TransitionError::Stale {
                ticket: ticket.generation,
                current: state.generation,
            });
        }
        // Work on a copy so a rejected transition leaves no partial change.
        let mut next = state.clone();
        f(&mut next)?;
        *state = next;
        Ok(state.clone())
    }
}

fn require_phase(
    state: &SessionSnapshot,
    phase: Phase,
    action: &'static str,
) -> Result<(), TransitionError> {
    if state.phase == phase {
        Ok(())
    } else {
        Err(TransitionError::InvalidPhase {
            action,
            phase: state.phase,
        })
    }
}

fn invalid_item(action: &'static str, position: usize, reason: &'static str) -> TransitionError {
    TransitionError::InvalidItem {
        action,
        position,
        reason,
    }
}
