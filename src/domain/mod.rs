//! Pure business rules with no database access.
//!
//! The services load rows, hand the relevant values to these functions and
//! persist whatever they decide.

pub mod attendance;
pub mod notifications;
pub mod progress;
pub mod seating;
pub mod todo_status;
pub mod vocab;

pub use attendance::AttendanceStatus;
pub use notifications::NotificationType;
pub use seating::AttendeeType;
pub use todo_status::TodoStatus;
