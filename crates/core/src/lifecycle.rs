//! Instance lifecycle state machine.
//!
//! ```text
//! Installing -> Starting -> Running -> Stopped
//!     |            |           |
//!     +------------+-----------+----> Failed
//! ```
//!
//! `Stopped` and `Failed` are terminal.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Installing,
    Starting,
    Running,
    Stopped,
    Failed,
}

/// Attempted transition not allowed by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid instance transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: InstanceStatus,
    pub to: InstanceStatus,
}

impl InstanceStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use InstanceStatus::*;
        matches!(
            (self, next),
            (Installing, Starting)
                | (Starting, Running)
                | (Running, Stopped)
                | (Installing | Starting | Running, Failed)
        )
    }

    /// Move to `next`, or report the illegal transition without changing state.
    pub fn transition(&mut self, next: Self) -> Result<(), InvalidTransition> {
        if !self.can_transition_to(next) {
            return Err(InvalidTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Installing => "installing",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
