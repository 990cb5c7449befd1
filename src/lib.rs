pub mod auth;
pub mod config;
pub mod error;
pub mod format;
pub mod registry;
pub mod server;
