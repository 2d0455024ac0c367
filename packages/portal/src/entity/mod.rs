pub mod comment;
pub mod content_history;
pub mod user;
