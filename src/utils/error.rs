use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unsupported site: {domain}")]
    UnsupportedSite { domain: String },

    #[error("Failed to launch browser session: {0}")]
    SessionLaunch(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timed out after {seconds}s waiting for {selector}")]
    Timeout { selector: String, seconds: u64 },

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Invalid locator '{selector}': {message}")]
    InvalidLocator { selector: String, message: String },

    #[error("In-page query failed: {0}")]
    Script(String),

    #[error("Input format error: {0}")]
    InputFormat(String),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors a task recovers from locally as "not found" rather than "error".
    pub fn is_timeout(&self) -> bool {
        matches!(self, AppError::Timeout { .. })
    }
}

impl From<calamine::Error> for AppError {
    fn from(err: calamine::Error) -> Self {
        AppError::Workbook(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        AppError::Workbook(err.to_string())
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
