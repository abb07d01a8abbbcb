// Services module
// Storage providers, AI chat/edit, diff review and credential encryption

pub mod ai;
pub mod auth;
pub mod crypto;
pub mod diff;
pub mod storage;

pub use auth::{AuthError, AuthService};
pub use crypto::{ConfigCipher, CryptoError};
pub use diff::{diff_lines, DiffHunk, DiffReview, HunkKind};
