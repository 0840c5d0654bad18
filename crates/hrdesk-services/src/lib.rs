//! hrdesk service layer
//!
//! Coordination that sits between the repositories and the job runner or HTTP
//! handlers. Currently hosts the notification emitter.

pub mod notification;

pub use notification::{NotificationService, NotificationServiceConfig};
