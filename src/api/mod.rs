pub mod auth;
pub mod connections;
pub mod users;
