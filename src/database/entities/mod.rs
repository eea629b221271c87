pub mod api_tokens;
pub mod budget_categories;
pub mod checklist_items;
pub mod expenses;
pub mod guest_children;
pub mod guests;
pub mod notification_preferences;
pub mod notifications;
pub mod registry_items;
pub mod seating_assignments;
pub mod seating_tables;
pub mod subtasks;
pub mod todo_attachments;
pub mod todo_categories;
pub mod todos;
pub mod users;
pub mod vendors;
pub mod wedding_members;
pub mod weddings;
