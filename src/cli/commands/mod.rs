pub mod auth;
pub mod config;
pub mod dashboard;
pub mod tasks;
pub mod users;
