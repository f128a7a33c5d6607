//! Error types.
//!
//! Two layers:
//!
//! - library errors (`SearchError`, `CandidateError`) are `thiserror` enums so
//!   callers can match on them
//! - `AppError` is the binary-facing error carrying a process exit code

use thiserror::Error;

/// Fatal errors for a whole search call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// Empty or malformed sample (raised before any enumeration).
    #[error("invalid sample: {0}")]
    Data(String),
    /// Invalid search configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The search completed but no candidate survived.
    #[error("no model found: every candidate combination was rejected")]
    NoModelFound,
}

/// Why a single candidate combination was discarded.
///
/// These never abort a search; the engine counts them and moves on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CandidateError {
    #[error("numerical failure: {0}")]
    Numerical(String),
    #[error("insufficient data: {available} usable rows, {required} required")]
    InsufficientData { available: usize, required: usize },
    #[error("coefficient for {term} not significant (|t|={t:.3} < {critical:.3})")]
    NotSignificant {
        term: String,
        t: f64,
        critical: f64,
    },
    #[error("coefficient sign for {variable} disagrees with its correlation with the dependent series")]
    SignMismatch { variable: String },
}

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

    pub fn exit_code(&self) -> u8 {
        self.exit_code
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

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        let code = match err {
            SearchError::Data(_) | SearchError::Config(_) => 2,
            SearchError::NoModelFound => 3,
        };
        AppError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_errors_map_to_exit_codes() {
        let err: AppError = SearchError::Data("empty".into()).into();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("empty"));

        let err: AppError = SearchError::NoModelFound.into();
        assert_eq!(err.exit_code(), 3);
    }
}
