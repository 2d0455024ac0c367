pub mod auth;
pub mod content;
pub mod history;
pub mod images;
pub mod users;
