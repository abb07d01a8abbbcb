// FiaCloud shared library
// Object storage browsing with AI-assisted editing

pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;

pub use models::*;
