// Data models

pub mod ai;
pub mod conversation;
pub mod storage;

pub use ai::*;
pub use conversation::*;
pub use storage::*;
