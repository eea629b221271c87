pub mod attachment_service;
pub mod auth_service;
pub mod authorization;
pub mod budget_service;
pub mod export_service;
pub mod guest_service;
pub mod notification_service;
pub mod registry_service;
pub mod seating_service;
pub mod todo_service;
pub mod validation;
pub mod vendor_service;
pub mod wedding_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use attachment_service::AttachmentService;
pub use auth_service::AuthService;
pub use authorization::{check_wedding_access, Access, WeddingAccess, WeddingRole};
pub use budget_service::BudgetService;
pub use export_service::ExportService;
pub use guest_service::GuestService;
pub use notification_service::NotificationService;
pub use registry_service::RegistryService;
pub use seating_service::SeatingService;
pub use todo_service::TodoService;
pub use validation::ValidationService;
pub use vendor_service::VendorService;
pub use wedding_service::WeddingService;
