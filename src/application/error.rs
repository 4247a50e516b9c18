//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("cannot write output")]
    Output {
        #[source]
        source: std::io::Error,
    },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    pub fn output(source: std::io::Error) -> Self {
        Self::Output { source }
    }

    /// True for a missing `--apikey`/`--out` before an action.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ApplicationError::Domain(DomainError::MissingApiKey)
                | ApplicationError::Domain(DomainError::MissingOutputPath)
        )
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
