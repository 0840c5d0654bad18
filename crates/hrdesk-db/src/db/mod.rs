//! Database repositories for data access layer
//!
//! Report state (requests, notifications, job locks) is owned by this service.
//! HR domain records and admin identities are read-only views over tables owned
//! by the surrounding HR system.

pub mod admin;
pub mod hr_data;
pub mod job_lock;
pub mod notification;
pub mod report;

pub use admin::{AdminDirectory, PostgresAdminDirectory};
pub use hr_data::{HrDataGateway, PostgresHrDataGateway};
pub use job_lock::{JobLock, PostgresJobLock};
pub use notification::{NotificationRepository, PostgresNotificationRepository};
pub use report::{PostgresReportRepository, ReportRepository};
