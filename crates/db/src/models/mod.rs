pub mod announcement;
pub mod api_key;
pub mod direct_message;
pub mod performance;
pub mod project;
pub mod reference;
pub mod task;
pub mod user;
