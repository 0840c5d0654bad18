pub mod domain;
pub mod notification;
pub mod report;

pub use domain::*;
pub use notification::*;
pub use report::*;
