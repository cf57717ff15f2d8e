use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::LifecycleStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Supersede,
    Correct,
    Delete,
    Approve,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Supersede => "supersede",
            Self::Correct => "correct",
            Self::Delete => "delete",
            Self::Approve => "approve",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {event} a {from} record")]
pub struct TransitionRejected {
    pub from: LifecycleStatus,
    pub event: LifecycleEvent,
}

/// Status the acted-on version moves to. Historical states are terminal.
pub fn transition(
    current: LifecycleStatus,
    event: LifecycleEvent,
) -> Result<LifecycleStatus, TransitionRejected> {
    use LifecycleEvent as E;
    use LifecycleStatus as S;

    match (current, event) {
        (S::Active, E::Supersede) => Ok(S::Superseded),
        (S::Active, E::Correct) => Ok(S::Corrected),
        (S::Active, E::Delete) => Ok(S::Deleted),
        (S::PendingApproval, E::Approve) => Ok(S::Active),
        (S::PendingApproval, E::Delete) => Ok(S::Deleted),
        (from, event) => Err(TransitionRejected { from, event }),
    }
}
