//! Todo progress derived from checklist items and subtasks, and the status
//! side effects of progress changes and explicit status writes.

use chrono::{DateTime, Utc};

use super::todo_status::TodoStatus;

/// Completion counts of a todo's children.
///
/// Cancelled subtasks are excluded before they get here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChildCounts {
    pub checklist_total: u64,
    pub checklist_completed: u64,
    pub subtasks_total: u64,
    pub subtasks_completed: u64,
}

impl ChildCounts {
    pub fn total(&self) -> u64 {
        self.checklist_total + self.subtasks_total
    }

    pub fn completed(&self) -> u64 {
        self.checklist_completed + self.subtasks_completed
    }

    pub fn has_children(&self) -> bool {
        self.total() > 0
    }

    /// `round(100 * completed / total)` with halves rounded up, or `None`
    /// when there is nothing to derive progress from.
    pub fn percent(&self) -> Option<i32> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let completed = self.completed().min(total);
        Some(((200 * completed + total) / (2 * total)) as i32)
    }
}

/// Status fields after a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusOutcome {
    pub status: TodoStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress_percent: i32,
}

/// Apply a freshly derived progress value to a todo.
///
/// Reaching 100 completes the todo; dropping below 100 while completed moves
/// it back to in_progress. Cancelled todos keep their status.
pub fn apply_progress(
    status: TodoStatus,
    completed_at: Option<DateTime<Utc>>,
    progress: i32,
    now: DateTime<Utc>,
) -> StatusOutcome {
    match status {
        TodoStatus::Cancelled => StatusOutcome {
            status,
            completed_at,
            progress_percent: progress,
        },
        TodoStatus::Completed if progress < 100 => StatusOutcome {
            status: TodoStatus::InProgress,
            completed_at: None,
            progress_percent: progress,
        },
        TodoStatus::Completed => StatusOutcome {
            status,
            completed_at: completed_at.or(Some(now)),
            progress_percent: progress,
        },
        _ if progress >= 100 => StatusOutcome {
            status: TodoStatus::Completed,
            completed_at: Some(now),
            progress_percent: 100,
        },
        _ => StatusOutcome {
            status,
            completed_at,
            progress_percent: progress,
        },
    }
}

/// Validate and apply an explicit status write.
///
/// Entering completed stamps `completed_at` and leaving it clears the stamp.
/// Without children, completing fills progress to 100 and entering
/// not_started resets it to 0. With children, progress stays the derived
/// value. Reopening to in_progress keeps progress.
pub fn apply_transition(
    from: TodoStatus,
    to: TodoStatus,
    completed_at: Option<DateTime<Utc>>,
    progress: i32,
    has_children: bool,
    now: DateTime<Utc>,
) -> Result<StatusOutcome, String> {
    if !from.can_transition_to(to) {
        return Err(format!(
            "Cannot change status from {} to {}",
            from.as_str(),
            to.as_str()
        ));
    }

    if from == to {
        return Ok(StatusOutcome {
            status: to,
            completed_at,
            progress_percent: progress,
        });
    }

    let outcome = match to {
        TodoStatus::Completed => StatusOutcome {
            status: to,
            completed_at: Some(now),
            progress_percent: if has_children { progress } else { 100 },
        },
        TodoStatus::NotStarted => StatusOutcome {
            status: to,
            completed_at: None,
            progress_percent: if has_children { progress } else { 0 },
        },
        _ => StatusOutcome {
            status: to,
            completed_at: None,
            progress_percent: progress,
        },
    };

    Ok(outcome)
}
