use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// In-memory lifecycle of a single worker registration.
///
/// ```text
/// Unconfigured -> Configuring -> Running -> Deregistering -> Terminated
/// ```
///
/// `Deregistering` is reachable from every non-terminal state so that a signal or crash
/// at any point still runs cleanup; `Terminated` is reachable from everywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleState {
    #[default]
    Unconfigured,
    Configuring,
    Running,
    Deregistering,
    Terminated,
}

impl LifecycleState {
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, next) {
            (Terminated, _) => false,
            (_, Terminated) => true,
            (Deregistering, _) => false,
            (_, Deregistering) => true,
            (Unconfigured, Configuring) => true,
            (Configuring, Running) => true,
            // Non-ephemeral restarts skip configuration.
            (Unconfigured, Running) => true,
            _ => false,
        }
    }

    /// Validated transition.
    pub fn transition(self, next: LifecycleState) -> ModelResult<LifecycleState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ModelError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Terminated)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Unconfigured => "unconfigured",
            LifecycleState::Configuring => "configuring",
            LifecycleState::Running => "running",
            LifecycleState::Deregistering => "deregistering",
            LifecycleState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}
