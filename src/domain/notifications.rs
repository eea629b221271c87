//! Notification vocabulary and due-date classification for the sweep

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// How far ahead of the due time a "due soon" alert fires
pub const DUE_SOON_LEAD_MINUTES: i64 = 30;
/// Window after the due time during which a todo counts as "due now"
pub const DUE_NOW_WINDOW_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    TodoDueSoon,
    TodoDueNow,
    TodoOverdue,
    RsvpAccepted,
    RsvpDeclined,
    General,
}

impl NotificationType {
    pub const ALL: [NotificationType; 6] = [
        NotificationType::TodoDueSoon,
        NotificationType::TodoDueNow,
        NotificationType::TodoOverdue,
        NotificationType::RsvpAccepted,
        NotificationType::RsvpDeclined,
        NotificationType::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::TodoDueSoon => "todo_due_soon",
            NotificationType::TodoDueNow => "todo_due_now",
            NotificationType::TodoOverdue => "todo_overdue",
            NotificationType::RsvpAccepted => "rsvp_accepted",
            NotificationType::RsvpDeclined => "rsvp_declined",
            NotificationType::General => "general",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Invalid notification type '{}'", s))
    }
}

/// Due instant of a todo. Without a time the todo is due at the end of the day.
pub fn due_datetime(due_date: NaiveDate, due_time: Option<NaiveTime>) -> DateTime<Utc> {
    let time = due_time.unwrap_or_else(end_of_day);
    Utc.from_utc_datetime(&due_date.and_time(time))
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

/// Which due-date alert, if any, applies at `now`
pub fn classify_due(due: DateTime<Utc>, now: DateTime<Utc>) -> Option<NotificationType> {
    let soon_from = due - Duration::minutes(DUE_SOON_LEAD_MINUTES);
    let overdue_from = due + Duration::minutes(DUE_NOW_WINDOW_MINUTES);

    if now < soon_from {
        None
    } else if now < due {
        Some(NotificationType::TodoDueSoon)
    } else if now < overdue_from {
        Some(NotificationType::TodoDueNow)
    } else {
        Some(NotificationType::TodoOverdue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 20, h, m, 0).unwrap()
    }

    #[test]
    fn missing_time_defaults_to_end_of_day() {
        let date = NaiveDate::from_ymd_opt(2026, 6, 20).unwrap();
        let due = due_datetime(date, None);
        assert_eq!(due, Utc.with_ymd_and_hms(2026, 6, 20, 23, 59, 59).unwrap());
    }

    #[test]
    fn classification_windows() {
        let due = at(15, 0);
        assert_eq!(classify_due(due, at(14, 0)), None);
        assert_eq!(classify_due(due, at(14, 30)), Some(NotificationType::TodoDueSoon));
        assert_eq!(classify_due(due, at(14, 59)), Some(NotificationType::TodoDueSoon));
        assert_eq!(classify_due(due, at(15, 0)), Some(NotificationType::TodoDueNow));
        assert_eq!(classify_due(due, at(15, 4)), Some(NotificationType::TodoDueNow));
        assert_eq!(classify_due(due, at(15, 5)), Some(NotificationType::TodoOverdue));
        assert_eq!(classify_due(due, at(23, 0)), Some(NotificationType::TodoOverdue));
    }

    #[test]
    fn types_round_trip() {
        for t in NotificationType::ALL {
            assert_eq!(t.as_str().parse::<NotificationType>(), Ok(t));
        }
    }
}
