// Utility functions module

pub mod object_key;
pub mod store;
