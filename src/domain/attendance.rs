use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::notifications::NotificationType;

/// A guest's RSVP answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Pending,
    Yes,
    No,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Pending => "pending",
            AttendanceStatus::Yes => "yes",
            AttendanceStatus::No => "no",
        }
    }

    pub fn has_responded(&self) -> bool {
        !matches!(self, AttendanceStatus::Pending)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AttendanceStatus::Pending),
            "yes" => Ok(AttendanceStatus::Yes),
            "no" => Ok(AttendanceStatus::No),
            other => Err(format!("Invalid attendance status '{}'", other)),
        }
    }
}

/// Notification to raise for an RSVP change, given the stored value before
/// the write and the value being written.
pub fn rsvp_notification(
    previous: AttendanceStatus,
    next: AttendanceStatus,
) -> Option<NotificationType> {
    if previous == next {
        return None;
    }
    match next {
        AttendanceStatus::Yes => Some(NotificationType::RsvpAccepted),
        AttendanceStatus::No => Some(NotificationType::RsvpDeclined),
        AttendanceStatus::Pending => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_status_raises_nothing() {
        assert_eq!(
            rsvp_notification(AttendanceStatus::Yes, AttendanceStatus::Yes),
            None
        );
    }

    #[test]
    fn accept_and_decline_map_to_types() {
        assert_eq!(
            rsvp_notification(AttendanceStatus::Pending, AttendanceStatus::Yes),
            Some(NotificationType::RsvpAccepted)
        );
        assert_eq!(
            rsvp_notification(AttendanceStatus::Yes, AttendanceStatus::No),
            Some(NotificationType::RsvpDeclined)
        );
    }

    #[test]
    fn reset_to_pending_is_silent() {
        assert_eq!(
            rsvp_notification(AttendanceStatus::No, AttendanceStatus::Pending),
            None
        );
    }
}
