//! Application error type.
//!
//! Every fallible operation in the crate returns `Result<_, AppError>`. The exit code
//! travels with the message so the binary can map failures to process status codes:
//!
//! - `2`: usage, configuration, or unreadable input files
//! - `3`: empty or insufficient data where data is mandatory
//! - `4`: corrupt or inconsistent model artifact
//! - `5`: inference worker pool failure

/// Bad flags, bad config, unreadable input.
pub const EXIT_INPUT: u8 = 2;
/// Required data is empty.
pub const EXIT_DATA: u8 = 3;
/// Model artifact failed to load.
pub const EXIT_MODEL: u8 = 4;
/// Worker pool could not be built.
pub const EXIT_POOL: u8 = 5;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Shorthand for a corrupt-artifact error.
    pub fn model(message: impl Into<String>) -> Self {
        Self::new(EXIT_MODEL, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
