// Access password
// Local gate in front of the app; resetting it wipes every stored value

use thiserror::Error;

use crate::repositories::{ConfigError, ConfigRepository};

/// Phrase that must be typed verbatim to wipe all data
pub const RESET_CONFIRMATION: &str = "我确认忘记密码并确认清空数据";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Incorrect password")]
    WrongPassword,

    /// Stored password exists but cannot be decrypted
    #[error("Stored password is unreadable, reset is required")]
    CorruptPassword,

    #[error("Confirmation phrase does not match")]
    ConfirmationMismatch,

    #[error("Config error: {0}")]
    Config(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    WrongPassword,
    CorruptPassword,
    ConfirmationMismatch,
    ConfigError,
}

impl AuthErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthErrorCode::WrongPassword => "AUTH_WRONG_PASSWORD",
            AuthErrorCode::CorruptPassword => "AUTH_CORRUPT_PASSWORD",
            AuthErrorCode::ConfirmationMismatch => "AUTH_CONFIRMATION_MISMATCH",
            AuthErrorCode::ConfigError => "AUTH_CONFIG_ERROR",
        }
    }
}

impl AuthError {
    pub fn code(&self) -> AuthErrorCode {
        match self {
            AuthError::WrongPassword => AuthErrorCode::WrongPassword,
            AuthError::CorruptPassword => AuthErrorCode::CorruptPassword,
            AuthError::ConfirmationMismatch => AuthErrorCode::ConfirmationMismatch,
            AuthError::Config(_) => AuthErrorCode::ConfigError,
        }
    }

    pub fn to_user_message(&self) -> String {
        match self {
            AuthError::WrongPassword => "Incorrect password, please try again.".to_string(),
            AuthError::CorruptPassword => {
                "Stored password could not be read. Reset to continue.".to_string()
            }
            AuthError::ConfirmationMismatch => format!(
                "To wipe all data, type the confirmation phrase exactly: {}",
                RESET_CONFIRMATION
            ),
            AuthError::Config(_) => self.to_string(),
        }
    }
}

impl From<ConfigError> for AuthError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Crypto(_) => AuthError::CorruptPassword,
            other => AuthError::Config(other.to_string()),
        }
    }
}

impl From<AuthError> for String {
    fn from(err: AuthError) -> Self {
        err.to_user_message()
    }
}

/// Login, password changes and full reset
#[derive(Clone)]
pub struct AuthService {
    config: ConfigRepository,
}

impl AuthService {
    pub fn new(config: ConfigRepository) -> Self {
        Self { config }
    }

    /// Whether a password is set
    pub fn is_protected(&self) -> AuthResult<bool> {
        Ok(self.config.load_access_password()?.is_some())
    }

    /// Check `password`; with no stored password any input passes
    pub fn verify(&self, password: &str) -> AuthResult<()> {
        match self.config.load_access_password()? {
            None => Ok(()),
            Some(stored) if stored == password => Ok(()),
            Some(_) => {
                log::warn!("[auth] Login rejected");
                Err(AuthError::WrongPassword)
            }
        }
    }

    /// Store a new password, or remove it on `None`/empty
    pub fn set_password(&self, password: Option<String>) -> AuthResult<()> {
        match password.filter(|p| !p.is_empty()) {
            Some(password) => {
                self.config.save_access_password(&password)?;
                log::info!("[auth] Access password updated");
            }
            None => {
                self.config.clear_access_password()?;
                log::info!("[auth] Access password removed");
            }
        }
        Ok(())
    }

    /// Wipe all persisted data once the confirmation phrase matches exactly
    pub fn reset(&self, confirmation: &str) -> AuthResult<()> {
        if confirmation != RESET_CONFIRMATION {
            return Err(AuthError::ConfirmationMismatch);
        }
        self.config.clear_all()?;
        log::warn!("[auth] All stored data cleared");
        Ok(())
    }
}
