pub mod auth;
pub mod claude_api;
pub mod flows;
pub mod performance;
