// Repositories module
// Typed access to the persisted key/value store

pub mod config_repo;
pub mod conversation_repo;

pub use config_repo::*;
pub use conversation_repo::*;
