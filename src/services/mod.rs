pub mod notifications;

pub use notifications::{DispatchReport, NotificationError, NotificationService, TestResults};
