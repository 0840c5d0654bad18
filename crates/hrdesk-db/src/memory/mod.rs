//! In-process implementations of the repository traits.
//!
//! Used by the test suites of the downstream crates and for running the API
//! without a database.

mod admin;
mod hr_data;
mod job_lock;
mod notification;
mod report;

pub use admin::InMemoryAdminDirectory;
pub use hr_data::InMemoryHrDataGateway;
pub use job_lock::InMemoryJobLock;
pub use notification::InMemoryNotificationRepository;
pub use report::InMemoryReportRepository;
