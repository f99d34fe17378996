//! Types describing sync passes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the orchestrator is within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PassState {
    #[default]
    Idle,
    /// Checking network constraints
    Checking,
    /// Sending the outbox batch
    Pushing,
    /// Fetching server changes
    Pulling,
    /// Applying conflict decisions
    Reconciling,
    /// Sync was stopped; no further passes are scheduled
    Aborted,
    /// The last pass hit an unrecoverable error
    Failed,
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PassState::Idle => "idle",
            PassState::Checking => "checking",
            PassState::Pushing => "pushing",
            PassState::Pulling => "pulling",
            PassState::Reconciling => "reconciling",
            PassState::Aborted => "aborted",
            PassState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a pass was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerReason {
    Manual,
    Scheduled,
    NetworkChange,
    Startup,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TriggerReason::Manual => "manual",
            TriggerReason::Scheduled => "scheduled",
            TriggerReason::NetworkChange => "networkChange",
            TriggerReason::Startup => "startup",
        };
        f.write_str(name)
    }
}

/// Overall result of one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PassOutcome {
    /// Every step succeeded
    Success,
    /// Completed, but some records or the pull failed
    Partial,
    /// Ended early on a transport or store failure
    Error,
    /// Network constraints not met; nothing was sent
    Skipped,
}

/// Summary of a finished pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    pub reason: TriggerReason,
    pub outcome: PassOutcome,
    /// Records acknowledged by the server
    pub pushed: usize,
    /// Server records received
    pub pulled: usize,
    /// Conflicts handed to the resolver
    pub conflicts: usize,
    /// Records rejected by the server
    pub rejected: usize,
    pub bytes_transferred: u64,
    /// Wall time of the pass in milliseconds
    pub duration: u64,
}

impl PassReport {
    pub(crate) fn new(reason: TriggerReason) -> Self {
        Self {
            reason,
            outcome: PassOutcome::Success,
            pushed: 0,
            pulled: 0,
            conflicts: 0,
            rejected: 0,
            bytes_transferred: 0,
            duration: 0,
        }
    }
}

/// What a trigger request led to.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// The pass ran in this call
    Completed(PassReport),
    /// Another pass was in flight; the request was folded into it
    Coalesced,
}

impl TriggerOutcome {
    pub fn report(&self) -> Option<&PassReport> {
        match self {
            TriggerOutcome::Completed(report) => Some(report),
            TriggerOutcome::Coalesced => None,
        }
    }
}
