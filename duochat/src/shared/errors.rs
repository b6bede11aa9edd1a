use thiserror::Error;

use crate::modules::auth::AuthError;
use crate::modules::chat::ApplicationError;
use crate::modules::config::ConfigError;
use crate::modules::room::RoomError;
use crate::modules::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("No active session")]
    NoActiveSession,

    #[error("{0}")]
    Rejected(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    /// 是否需要弹出阻塞式错误提示
    pub fn is_dialog_worthy(&self) -> bool {
        matches!(
            self,
            AppError::DatabaseError(_) | AppError::ConfigError(_) | AppError::IoError(_)
        )
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::AuthError(err.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<ApplicationError> for AppError {
    fn from(err: ApplicationError) -> Self {
        match err {
            ApplicationError::StoreError(e) => e.into(),
            ApplicationError::AuthError(e) => e.into(),
            ApplicationError::Rejected(reason) => AppError::Rejected(reason.to_string()),
            ApplicationError::ValidationError(msg) => AppError::InvalidInput(msg),
            ApplicationError::Forbidden(msg) => AppError::Rejected(msg),
            ApplicationError::NotAuthenticated => AppError::Rejected("Not signed in".to_string()),
            other => AppError::Unknown(other.to_string()),
        }
    }
}

impl From<RoomError> for AppError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::Store(e) => e.into(),
            RoomError::Auth(e) => e.into(),
            RoomError::EmptyMessage => AppError::Rejected(err.to_string()),
            RoomError::NotJoined => AppError::InvalidInput(err.to_string()),
        }
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
