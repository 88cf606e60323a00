use thiserror::Error;

pub type Result<T, E = HabitError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HabitError {
    /// Rejected user input, shown to the user as a blocking prompt.
    #[error("invalid habit: {0}")]
    Validation(String),
    #[error("no habit with id `{id}`")]
    NotFound { id: String },
    #[error("failed to read `{key}` from storage: {reason}")]
    StorageRead { key: String, reason: String },
    #[error("failed to write `{key}` to storage: {reason}")]
    StorageWrite { key: String, reason: String },
    #[error("notifications unavailable: {0}")]
    NotificationUnavailable(String),
}

impl HabitError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }
}
