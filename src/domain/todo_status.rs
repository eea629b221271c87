use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    NotStarted,
    InProgress,
    Waiting,
    Completed,
    Cancelled,
}

impl TodoStatus {
    pub const ALL: [TodoStatus; 5] = [
        TodoStatus::NotStarted,
        TodoStatus::InProgress,
        TodoStatus::Waiting,
        TodoStatus::Completed,
        TodoStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TodoStatus::NotStarted => "not_started",
            TodoStatus::InProgress => "in_progress",
            TodoStatus::Waiting => "waiting",
            TodoStatus::Completed => "completed",
            TodoStatus::Cancelled => "cancelled",
        }
    }

    /// States reachable from this one in a single update
    pub fn allowed_transitions(&self) -> &'static [TodoStatus] {
        use TodoStatus::*;
        match self {
            NotStarted => &[InProgress, Waiting, Completed, Cancelled],
            InProgress => &[NotStarted, Waiting, Completed, Cancelled],
            Waiting => &[NotStarted, InProgress, Completed, Cancelled],
            Completed => &[InProgress, NotStarted],
            Cancelled => &[NotStarted, InProgress],
        }
    }

    /// Writing the current status again is a no-op and always allowed
    pub fn can_transition_to(&self, next: TodoStatus) -> bool {
        *self == next || self.allowed_transitions().contains(&next)
    }

    /// Still open work: neither completed nor cancelled
    pub fn is_active(&self) -> bool {
        !matches!(self, TodoStatus::Completed | TodoStatus::Cancelled)
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TodoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TodoStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid status '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_cannot_go_to_waiting() {
        assert!(!TodoStatus::Completed.can_transition_to(TodoStatus::Waiting));
        assert!(!TodoStatus::Completed.can_transition_to(TodoStatus::Cancelled));
    }

    #[test]
    fn completed_reopens_to_in_progress_or_not_started() {
        assert!(TodoStatus::Completed.can_transition_to(TodoStatus::InProgress));
        assert!(TodoStatus::Completed.can_transition_to(TodoStatus::NotStarted));
    }

    #[test]
    fn cancelled_only_restarts() {
        assert!(TodoStatus::Cancelled.can_transition_to(TodoStatus::NotStarted));
        assert!(!TodoStatus::Cancelled.can_transition_to(TodoStatus::Completed));
    }

    #[test]
    fn same_state_is_allowed() {
        for status in TodoStatus::ALL {
            assert!(status.can_transition_to(status));
        }
    }

    #[test]
    fn round_trips_through_strings() {
        for status in TodoStatus::ALL {
            assert_eq!(status.as_str().parse::<TodoStatus>(), Ok(status));
        }
        assert!("done".parse::<TodoStatus>().is_err());
    }
}
