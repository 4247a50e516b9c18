//! Infrastructure-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;

/// Infrastructure errors wrap application errors and add I/O-level concerns.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("service answered HTTP {status}")]
    Http { status: u16 },

    #[error("request failed: {context}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in response: {0}")]
    InvalidJson(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("cannot set up HTTP client")]
    ClientSetup {
        #[source]
        source: reqwest::Error,
    },
}

impl InfraError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a transport error with context.
    pub fn transport(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            context: context.into(),
            source,
        }
    }

    /// Numeric code printed for a failed client call.
    ///
    /// HTTP failures report the HTTP status, local I/O failures the OS error
    /// number. Everything else is a small negative code.
    pub fn status_code(&self) -> i32 {
        match self {
            InfraError::Http { status } => i32::from(*status),
            InfraError::Io { source, .. } => source.raw_os_error().unwrap_or(-1),
            InfraError::Transport { .. } | InfraError::ClientSetup { .. } => -1,
            InfraError::InvalidJson(_) => -2,
            InfraError::InvalidRequest(_) => -3,
            InfraError::Application(_) => -4,
        }
    }
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;
