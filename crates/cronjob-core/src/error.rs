use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid functions URL '{url}': {reason}")]
    InvalidFunctionsUrl { url: String, reason: String },

    #[error("Invalid pg_cron version: {0}")]
    InvalidVersion(String),
}

impl CoreError {
    /// Short error code string, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Config(_) => "CONFIG_ERROR",
            CoreError::InvalidFunctionsUrl { .. } => "INVALID_FUNCTIONS_URL",
            CoreError::InvalidVersion(_) => "INVALID_VERSION",
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
