use thiserror::Error;

/// Application error type
///
/// Every variant aborts a check cycle the same way: exchange fields are
/// cleared, the browser session is released and no outcome is written.
#[derive(Debug, Error)]
pub enum AppError {
    /// An expected page element never showed up (or the result page was unreadable)
    #[error("target unavailable at step '{step}' (locator: {locator})")]
    TargetUnavailable { step: &'static str, locator: String },

    /// The human did not answer the CAPTCHA in time
    #[error("no CAPTCHA answer for user {user_id} within the wait bound")]
    CaptchaTimeout { user_id: i64 },

    /// The record store could not be reached or queried
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Browser launch or DevTools protocol failure
    #[error("browser error: {0}")]
    Browser(String),

    /// No record with this id
    #[error("record {user_id} not found")]
    NotFound { user_id: i64 },

    /// A cycle is already running for this record
    #[error("a status check is already running for user {user_id}")]
    CycleInProgress { user_id: i64 },

    /// Rejected user input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration file could not be read or parsed
    #[error("config error: {0}")]
    Config(String),
}

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

// ========== Convenience constructors ==========

impl AppError {
    /// Element missing after its wait bound
    pub fn target_unavailable(step: &'static str, locator: impl Into<String>) -> Self {
        AppError::TargetUnavailable {
            step,
            locator: locator.into(),
        }
    }

    /// Browser-level failure from any displayable source
    pub fn browser(source: impl std::fmt::Display) -> Self {
        AppError::Browser(source.to_string())
    }

    /// The one expected failure: the human simply didn't answer in time.
    pub fn is_benign(&self) -> bool {
        matches!(self, AppError::CaptchaTimeout { .. })
    }
}

/// Application result type
pub type AppResult<T> = Result<T, AppError>;
