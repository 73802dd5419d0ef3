//! Broadcast session state machine types.

use serde::{Deserialize, Serialize};

/// State of the external broadcast process session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No process has been launched yet.
    #[default]
    NotStarted,

    /// The broadcast process is running and showing filler.
    Running,

    /// The broadcast process is running and a clip is in the active slot.
    AwaitingSwitch,

    /// The last process exited (crash or stop) and has not been relaunched.
    Stopped,
}

impl SessionState {
    /// Returns true if a broadcast process is currently alive.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running | Self::AwaitingSwitch)
    }

    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "NotStarted",
            Self::Running => "Running",
            Self::AwaitingSwitch => "AwaitingSwitch",
            Self::Stopped => "Stopped",
        }
    }
}

/// Why a broadcast process run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Terminated through the controller's stop operation.
    Requested,

    /// The process finished on its own without an error status.
    Exited { code: Option<i32> },
}

impl StopReason {
    /// Returns a display message for this reason.
    pub fn message(&self) -> String {
        match self {
            Self::Requested => "Broadcast stopped on request".to_string(),
            Self::Exited { code: Some(code) } => format!("Broadcast exited with code {code}"),
            Self::Exited { code: None } => "Broadcast terminated by signal".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_includes_awaiting_switch() {
        assert!(SessionState::Running.is_running());
        assert!(SessionState::AwaitingSwitch.is_running());
        assert!(!SessionState::NotStarted.is_running());
        assert!(!SessionState::Stopped.is_running());
    }

    #[test]
    fn test_stop_reason_message() {
        assert_eq!(
            StopReason::Exited { code: Some(1) }.message(),
            "Broadcast exited with code 1"
        );
    }
}
