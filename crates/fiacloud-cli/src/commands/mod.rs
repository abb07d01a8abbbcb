// CLI command implementations

pub mod auth;
pub mod chat;
pub mod config;
pub mod edit;
pub mod files;
