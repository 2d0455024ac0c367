pub mod auth;
pub mod content;
pub mod history;
pub mod shared;
pub mod users;
